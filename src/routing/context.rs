//! Per-call request context.
//!
//! A context is created for one call, cloned into every action that runs for
//! it, and dropped when the call resolves. All clones of one call share a
//! cursor over the route iterator, so `advance()` from any action continues
//! the same traversal.

use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{DispatchError, DispatchResult};
use crate::observability::metrics;
use crate::routing::iter::{MatchFrame, RouteIter};
use crate::routing::route::{RouteAction, RouteNode};

/// Mutable per-call bag handed to route actions.
#[derive(Clone, Default)]
pub struct RequestContext {
    /// Full path on entry; the consumed prefix inside an action.
    pub path: String,
    pub base_url: String,
    /// Caller params merged with the current frame's route params.
    pub params: Map<String, Value>,
    pub args: Vec<Value>,
    pub metadata: Map<String, Value>,
    pub response: Option<Value>,
    pub error: Option<DispatchError>,
    /// Node whose action is running.
    pub route: Option<Arc<RouteNode>>,
    cursor: Option<Arc<Cursor>>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Route or caller parameter as a string.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// Step to the next matching route and run its action.
    ///
    /// Resolves to `Ok(None)` once the traversal is exhausted, or when called
    /// on a context that is not part of a dispatch.
    pub fn advance(&self) -> BoxFuture<'static, DispatchResult<Option<Value>>> {
        match &self.cursor {
            Some(cursor) => cursor.clone().step(),
            None => future::ready(Ok(None)).boxed(),
        }
    }

    /// Terminate the dispatch with `value`.
    pub fn finish(&self, value: Value) {
        if let Some(cursor) = &self.cursor {
            let mut outcome = cursor.outcome.lock();
            outcome.result = Some(value);
            outcome.done = true;
        }
    }

    pub(crate) fn attach(&mut self, cursor: Arc<Cursor>) {
        self.cursor = Some(cursor);
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("path", &self.path)
            .field("base_url", &self.base_url)
            .field("params", &self.params)
            .field("args", &self.args)
            .field("metadata", &self.metadata)
            .field("response", &self.response)
            .field("error", &self.error)
            .field("route", &self.route.as_ref().map(|r| r.path().to_string()))
            .finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub done: bool,
    pub result: Option<Value>,
    /// The last handler fault handed to the error route.
    pub fault: Option<DispatchError>,
}

/// Shared traversal state for one dispatch.
pub(crate) struct Cursor {
    iter: Mutex<RouteIter>,
    base: RequestContext,
    error_route: Option<Arc<RouteNode>>,
    pub(crate) outcome: Mutex<Outcome>,
}

impl Cursor {
    pub(crate) fn new(iter: RouteIter, base: RequestContext, error_route: Option<Arc<RouteNode>>) -> Self {
        Self {
            iter: Mutex::new(iter),
            base,
            error_route,
            outcome: Mutex::new(Outcome::default()),
        }
    }

    pub(crate) fn error_route(&self) -> Option<&Arc<RouteNode>> {
        self.error_route.as_ref()
    }

    fn step(self: Arc<Self>) -> BoxFuture<'static, DispatchResult<Option<Value>>> {
        async move {
            let next = self.iter.lock().next();
            let Some(frame) = next else {
                self.outcome.lock().done = true;
                return Ok(None);
            };

            metrics::record_route_step();
            let Some(action) = frame.node.effective_action() else {
                return Ok(None);
            };

            let mut ctx = self.frame_context(&frame);
            tracing::debug!(
                route = frame.node.path(),
                base_url = %frame.base_url,
                matched = %frame.path,
                "Running route action"
            );

            match invoke(&action, ctx.clone()).await {
                Err(err) => {
                    let Some(handler) = self.error_route.as_ref().and_then(|r| r.effective_action()) else {
                        return Err(err);
                    };
                    tracing::debug!(error = %err, "Route action failed, running error route");
                    metrics::record_error_route(err.kind());
                    let err = err.with_default_status();
                    self.outcome.lock().fault = Some(err.clone());
                    ctx.error = Some(err);
                    invoke(&handler, ctx).await
                }
                ok => ok,
            }
        }
        .boxed()
    }

    fn frame_context(self: &Arc<Self>, frame: &MatchFrame) -> RequestContext {
        let mut ctx = self.base.clone();
        ctx.path = frame.path.clone();
        ctx.base_url = frame.base_url.clone();
        for (name, value) in &frame.params {
            ctx.params.insert(name.clone(), Value::String(value.clone()));
        }
        for (key, value) in frame.node.context() {
            ctx.metadata.insert(key.clone(), value.clone());
        }
        ctx.response = None;
        ctx.route = Some(frame.node.clone());
        ctx.cursor = Some(self.clone());
        ctx
    }
}

/// Run an action, turning panics raised while building or polling its
/// future into handler faults.
pub(crate) async fn invoke(action: &RouteAction, ctx: RequestContext) -> DispatchResult<Option<Value>> {
    let fut = match panic::catch_unwind(AssertUnwindSafe(|| action(ctx))) {
        Ok(fut) => fut,
        Err(payload) => return Err(panic_fault(payload)),
    };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(panic_fault(payload)),
    }
}

fn panic_fault(payload: Box<dyn Any + Send>) -> DispatchError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "route action panicked".to_string());
    DispatchError::fault(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::action;

    #[tokio::test]
    async fn test_detached_context_is_inert() {
        let ctx = RequestContext::new("/users");
        assert_eq!(ctx.advance().await.unwrap(), None);
        ctx.finish(Value::from(1));
    }

    #[tokio::test]
    async fn test_invoke_converts_panics() {
        let sync_panic = action(|_ctx| -> futures_util::future::Ready<DispatchResult<Option<Value>>> {
            panic!("sync boom")
        });
        let err = invoke(&sync_panic, RequestContext::new("/")).await.unwrap_err();
        assert_eq!(err, DispatchError::fault("sync boom"));

        let async_panic = action(|_ctx| async move {
            if true {
                panic!("async boom");
            }
            Ok(None)
        });
        let err = invoke(&async_panic, RequestContext::new("/")).await.unwrap_err();
        assert_eq!(err.to_string(), "async boom");
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_param_lookup() {
        let mut params = Map::new();
        params.insert("id".into(), Value::from("7"));
        params.insert("n".into(), Value::from(3));
        let ctx = RequestContext::new("/").with_params(params);
        assert_eq!(ctx.param("id"), Some("7"));
        assert_eq!(ctx.param("n"), None);
    }
}
