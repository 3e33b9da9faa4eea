//! Service traits.
//!
//! [`Service`] is what a service author implements: the six literal CRUD
//! operations plus an action table. [`ServiceApi`] is what callers see: one
//! `call` entry point with CRUD-shaped helpers on top. The action resolver,
//! local registrations and remote proxies all expose [`ServiceApi`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DispatchError, DispatchResult};
use crate::service::action::ActionTable;
use crate::service::params::{Id, Params, ServiceCall};
use crate::service::Method;

/// A CRUD service implementation.
///
/// Unimplemented verbs fail with a 501 handler fault.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    async fn find(&self, _params: Params) -> DispatchResult<Value> {
        Err(DispatchError::not_implemented(Method::Find))
    }

    async fn get(&self, _id: String, _params: Params) -> DispatchResult<Value> {
        Err(DispatchError::not_implemented(Method::Get))
    }

    async fn create(&self, _data: Value, _params: Params) -> DispatchResult<Value> {
        Err(DispatchError::not_implemented(Method::Create))
    }

    /// `id` is `None` for an explicit multi-target update.
    async fn update(&self, _id: Option<String>, _data: Value, _params: Params) -> DispatchResult<Value> {
        Err(DispatchError::not_implemented(Method::Update))
    }

    /// `id` is `None` for an explicit multi-target patch.
    async fn patch(&self, _id: Option<String>, _data: Value, _params: Params) -> DispatchResult<Value> {
        Err(DispatchError::not_implemented(Method::Patch))
    }

    /// `id` is `None` for an explicit multi-target remove.
    async fn remove(&self, _id: Option<String>, _params: Params) -> DispatchResult<Value> {
        Err(DispatchError::not_implemented(Method::Remove))
    }

    /// Named actions, built once when the service is registered.
    fn actions() -> ActionTable<Self>
    where
        Self: Sized,
    {
        ActionTable::new()
    }

    /// Called once when the application starts.
    fn setup(&self, _location: &str) {}
}

/// Caller-side view of a service.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    async fn call(&self, method: Method, call: ServiceCall) -> DispatchResult<Value>;

    fn setup(&self, _location: &str) {}

    async fn find(&self, params: Params) -> DispatchResult<Value> {
        self.call(Method::Find, ServiceCall::new(None, None, params)).await
    }

    async fn get(&self, id: Option<Id>, params: Params) -> DispatchResult<Value> {
        self.call(Method::Get, ServiceCall::new(id, None, params)).await
    }

    async fn create(&self, data: Value, params: Params) -> DispatchResult<Value> {
        self.call(Method::Create, ServiceCall::new(None, Some(data), params)).await
    }

    async fn update(&self, id: Option<Id>, data: Value, params: Params) -> DispatchResult<Value> {
        self.call(Method::Update, ServiceCall::new(id, Some(data), params)).await
    }

    async fn patch(&self, id: Option<Id>, data: Value, params: Params) -> DispatchResult<Value> {
        self.call(Method::Patch, ServiceCall::new(id, Some(data), params)).await
    }

    async fn remove(&self, id: Option<Id>, params: Params) -> DispatchResult<Value> {
        self.call(Method::Remove, ServiceCall::new(id, None, params)).await
    }

    /// Handle whose calls all carry the `name` action marker.
    fn action(&self, name: &str) -> ActionRef<'_, Self>
    where
        Self: Sized,
    {
        ActionRef::new(self, name)
    }
}

/// CRUD-shaped calls that all target one named action.
pub struct ActionRef<'a, A: ?Sized> {
    api: &'a A,
    name: String,
}

impl<'a, A: ServiceApi + ?Sized> ActionRef<'a, A> {
    pub fn new(api: &'a A, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }

    fn mark(&self, params: Params) -> Params {
        params.with_action(self.name.clone())
    }

    pub async fn find(&self, params: Params) -> DispatchResult<Value> {
        self.api.find(self.mark(params)).await
    }

    pub async fn get(&self, id: Option<Id>, params: Params) -> DispatchResult<Value> {
        self.api.get(id, self.mark(params)).await
    }

    pub async fn create(&self, data: Value, params: Params) -> DispatchResult<Value> {
        self.api.create(data, self.mark(params)).await
    }

    pub async fn update(&self, id: Option<Id>, data: Value, params: Params) -> DispatchResult<Value> {
        self.api.update(id, data, self.mark(params)).await
    }

    pub async fn patch(&self, id: Option<Id>, data: Value, params: Params) -> DispatchResult<Value> {
        self.api.patch(id, data, self.mark(params)).await
    }

    pub async fn remove(&self, id: Option<Id>, params: Params) -> DispatchResult<Value> {
        self.api.remove(id, self.mark(params)).await
    }
}
