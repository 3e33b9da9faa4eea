//! CRUD-versus-action resolution for one service.
//!
//! # Decision Order
//! ```text
//! create with array data  → one create per element, results collected
//! action marker present   → action (marker always wins, verb irrelevant)
//! get/update/patch/remove
//!   with id naming a registered action → action, id becomes undefined
//! otherwise               → literal CRUD call (id validated)
//! ```
//!
//! # Design Decisions
//! - Handlers receive the bare service, never the resolver, so an action
//!   cannot re-enter resolution
//! - Markers are stripped before any handler runs
//! - Prefetching the target record is opt-in per action

use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{DispatchError, DispatchResult};
use crate::observability::metrics;
use crate::service::action::{ActionArgs, ActionTable};
use crate::service::api::{Service, ServiceApi};
use crate::service::params::{Id, Params, ServiceCall};
use crate::service::Method;

/// What a call resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Crud,
    Action { name: String, id: Option<Id> },
}

/// Wraps a [`Service`] and routes each call to a CRUD method or an action.
pub struct ActionResolver<S> {
    name: String,
    service: Arc<S>,
    actions: ActionTable<S>,
}

impl<S: Service> ActionResolver<S> {
    /// Resolver using the service's own action table.
    pub fn new(name: impl Into<String>, service: S) -> Self {
        Self::with_actions(name, Arc::new(service), S::actions())
    }

    pub fn with_actions(name: impl Into<String>, service: Arc<S>, actions: ActionTable<S>) -> Self {
        Self {
            name: name.into(),
            service,
            actions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn actions(&self) -> &ActionTable<S> {
        &self.actions
    }

    /// Decide whether `call` is a literal CRUD call or an action.
    pub fn resolve(&self, method: Method, call: &ServiceCall) -> Intent {
        if let Some(marker) = call.params.action_marker() {
            return Intent::Action {
                name: marker.to_string(),
                id: call.id.clone(),
            };
        }

        if method.takes_id() {
            if let Some(Id::Key(key)) = &call.id {
                if self.actions.contains(key) {
                    return Intent::Action {
                        name: key.clone(),
                        id: None,
                    };
                }
            }
        }

        Intent::Crud
    }

    async fn run_crud(&self, method: Method, call: ServiceCall) -> DispatchResult<Value> {
        let ServiceCall { id, data, params } = call;
        let data = data.unwrap_or(Value::Null);
        tracing::debug!(service = %self.name, verb = %method, id = ?id, "Running service method");

        match method {
            Method::Find => self.service.find(params).await,
            Method::Get => match id {
                Some(Id::Key(key)) => self.service.get(key, params).await,
                _ => Err(DispatchError::MissingIdentifier { verb: method }),
            },
            Method::Create => self.service.create(data, params).await,
            Method::Update => {
                let id = require_target(method, id)?;
                self.service.update(id, data, params).await
            }
            Method::Patch => {
                let id = require_target(method, id)?;
                self.service.patch(id, data, params).await
            }
            Method::Remove => {
                let id = require_target(method, id)?;
                self.service.remove(id, params).await
            }
        }
    }

    async fn run_action(
        &self,
        method: Method,
        name: &str,
        id: Option<Id>,
        call: ServiceCall,
    ) -> DispatchResult<Value> {
        let Some(action) = self.actions.get(name).cloned() else {
            return Err(DispatchError::ActionNotImplemented {
                verb: method,
                action: name.to_string(),
            });
        };

        let ServiceCall { data, mut params, .. } = call;
        params.strip_action();
        let key = id.as_ref().and_then(Id::key).map(str::to_string);
        tracing::debug!(service = %self.name, verb = %method, action = name, id = ?key, "Running service action");

        let args = match method {
            Method::Find | Method::Get => ActionArgs::Query { params },
            Method::Create | Method::Update | Method::Patch => {
                let origin = self.prefetch(action.prefetch, key.as_deref(), &params).await?;
                ActionArgs::Write {
                    id: key,
                    data: data.unwrap_or(Value::Null),
                    params,
                    origin,
                }
            }
            Method::Remove => {
                let origin = self.prefetch(action.prefetch, key.as_deref(), &params).await?;
                ActionArgs::Remove {
                    id: key,
                    params,
                    origin,
                }
            }
        };

        (action.handler)(self.service.clone(), args).await
    }

    async fn prefetch(&self, enabled: bool, key: Option<&str>, params: &Params) -> DispatchResult<Option<Value>> {
        let Some(key) = key.filter(|_| enabled) else {
            return Ok(None);
        };
        let lookup = Params {
            query: params.query.clone(),
            ..Params::default()
        };
        match self.service.get(key.to_string(), lookup).await? {
            Value::Null => Err(DispatchError::NotFound(format!("record {key} in {}", self.name))),
            origin => Ok(Some(origin)),
        }
    }
}

fn require_target(method: Method, id: Option<Id>) -> DispatchResult<Option<String>> {
    match id {
        Some(Id::Key(key)) => Ok(Some(key)),
        Some(Id::All) if method.allows_multi() => Ok(None),
        _ => Err(DispatchError::MissingIdentifier { verb: method }),
    }
}

#[async_trait]
impl<S: Service> ServiceApi for ActionResolver<S> {
    async fn call(&self, method: Method, call: ServiceCall) -> DispatchResult<Value> {
        if method == Method::Create {
            if let Some(Value::Array(items)) = &call.data {
                let calls = items.iter().cloned().map(|item| {
                    self.call(Method::Create, ServiceCall::new(None, Some(item), call.params.clone()))
                });
                return try_join_all(calls).await.map(Value::Array);
            }
        }

        let intent = self.resolve(method, &call);
        let kind = if intent == Intent::Crud { "crud" } else { "action" };
        metrics::record_service_call(&self.name, method.as_str(), kind);

        match intent {
            Intent::Crud => self.run_crud(method, call).await,
            Intent::Action { name, id } => self.run_action(method, &name, id, call).await,
        }
    }

    fn setup(&self, location: &str) {
        self.service.setup(location);
    }
}
