//! Named, non-CRUD service operations.
//!
//! Actions are registered in an explicit table when a service is wired up
//! and looked up by name. A name equal to a CRUD verb is never an action.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::DispatchResult;
use crate::service::method::is_crud_name;
use crate::service::params::Params;

/// Arguments handed to an action, shaped by the verb it was reached through.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionArgs {
    /// Reached through `find` or `get`.
    Query { params: Params },
    /// Reached through `create`, `update` or `patch`.
    Write {
        id: Option<String>,
        data: Value,
        params: Params,
        origin: Option<Value>,
    },
    /// Reached through `remove`.
    Remove {
        id: Option<String>,
        params: Params,
        origin: Option<Value>,
    },
}

impl ActionArgs {
    pub fn params(&self) -> &Params {
        match self {
            ActionArgs::Query { params }
            | ActionArgs::Write { params, .. }
            | ActionArgs::Remove { params, .. } => params,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ActionArgs::Query { .. } => None,
            ActionArgs::Write { id, .. } | ActionArgs::Remove { id, .. } => id.as_deref(),
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ActionArgs::Write { data, .. } => Some(data),
            _ => None,
        }
    }

    /// The prefetched target record, for actions registered with prefetch.
    pub fn origin(&self) -> Option<&Value> {
        match self {
            ActionArgs::Query { .. } => None,
            ActionArgs::Write { origin, .. } | ActionArgs::Remove { origin, .. } => origin.as_ref(),
        }
    }
}

/// Handler invoked with the service instance and the shaped arguments.
pub type ActionHandler<S> =
    Arc<dyn Fn(Arc<S>, ActionArgs) -> BoxFuture<'static, DispatchResult<Value>> + Send + Sync>;

/// A registered action.
pub struct Action<S> {
    pub handler: ActionHandler<S>,
    /// Fetch the target record with `get` before running.
    pub prefetch: bool,
}

impl<S> Clone for Action<S> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            prefetch: self.prefetch,
        }
    }
}

/// Action name to handler.
pub struct ActionTable<S> {
    actions: BTreeMap<String, Action<S>>,
}

impl<S> Default for ActionTable<S> {
    fn default() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }
}

impl<S: Send + Sync + 'static> ActionTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`.
    pub fn on<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<S>, ActionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult<Value>> + Send + 'static,
    {
        self.insert(name.into(), f, false)
    }

    /// Register `name`, prefetching the target record when called with an id.
    pub fn on_prefetched<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<S>, ActionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult<Value>> + Send + 'static,
    {
        self.insert(name.into(), f, true)
    }

    fn insert<F, Fut>(mut self, name: String, f: F, prefetch: bool) -> Self
    where
        F: Fn(Arc<S>, ActionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult<Value>> + Send + 'static,
    {
        if is_crud_name(&name) {
            tracing::warn!(action = %name, "Ignoring action named after a CRUD verb");
            return self;
        }
        let handler: ActionHandler<S> = Arc::new(move |service, args| f(service, args).boxed());
        self.actions.insert(name, Action { handler, prefetch });
        self
    }
}

impl<S> ActionTable<S> {
    /// Look up `name`. CRUD verb names never resolve.
    pub fn get(&self, name: &str) -> Option<&Action<S>> {
        if is_crud_name(name) {
            return None;
        }
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<S> fmt::Debug for ActionTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.actions.keys()).finish()
    }
}
