//! Route dispatch.
//!
//! # Responsibilities
//! - Hold a frozen route tree and its error route
//! - Drive the route iterator one step at a time for a call
//! - Stop at the first defined result, or fall back to the error route
//!
//! # Design Decisions
//! - Immutable after construction; share via `Arc` across concurrent calls
//! - Every call gets its own iterator and context, nothing per-call is shared
//! - Patterns are compiled when the router is built so bad patterns fail at
//!   startup, not on the first request that reaches them

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{DispatchError, DispatchResult};
use crate::observability::metrics;
use crate::routing::context::{invoke, Cursor, RequestContext};
use crate::routing::iter::RouteIter;
use crate::routing::pattern::{self, PatternError};
use crate::routing::route::RouteNode;

/// A frozen route tree ready to serve calls.
#[derive(Debug, Clone)]
pub struct Router {
    root: Arc<RouteNode>,
    error_route: Option<Arc<RouteNode>>,
}

impl Router {
    /// Freeze `root` for dispatch.
    pub fn new(root: RouteNode) -> Result<Self, PatternError> {
        let mut invalid = None;
        root.walk(&mut |node, _| {
            if invalid.is_none() {
                if let Err(e) = pattern::compile(node.path(), node.is_leaf()) {
                    invalid = Some(e);
                }
            }
        });
        if let Some(e) = invalid {
            return Err(e);
        }

        let error_route = root.error_route();
        Ok(Self {
            root: Arc::new(root),
            error_route,
        })
    }

    /// Freeze a list of routes under an implicit `/` branch.
    pub fn from_routes<I>(routes: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = RouteNode>,
    {
        Self::new(RouteNode::from_routes(routes))
    }

    pub fn root(&self) -> &Arc<RouteNode> {
        &self.root
    }

    pub fn has_error_route(&self) -> bool {
        self.error_route.is_some()
    }

    /// Frames matching `path`, lazily.
    pub fn matches(&self, path: &str) -> RouteIter {
        RouteIter::new(self.root.clone(), "", path)
    }

    /// Dispatch a bare path.
    pub async fn dispatch_path(&self, path: &str) -> DispatchResult<Option<Value>> {
        self.dispatch(RequestContext::new(path)).await
    }

    /// Run the actions matching `ctx.path` until one produces a result.
    ///
    /// When nothing produces a result the error route, if any, sees `NotFound`.
    pub async fn dispatch(&self, ctx: RequestContext) -> DispatchResult<Option<Value>> {
        self.dispatch_with(ctx, true).await
    }

    /// Like [`dispatch`](Self::dispatch), but an exhausted walk simply yields
    /// `None`. Used for middleware chains in front of a service.
    pub async fn dispatch_chain(&self, ctx: RequestContext) -> DispatchResult<Option<Value>> {
        self.dispatch_with(ctx, false).await
    }

    async fn dispatch_with(&self, mut ctx: RequestContext, not_found: bool) -> DispatchResult<Option<Value>> {
        let start = Instant::now();
        let path = ctx.path.clone();
        let cursor = Arc::new(Cursor::new(
            self.matches(&path),
            ctx.clone(),
            self.error_route.clone(),
        ));
        ctx.attach(cursor.clone());

        let outcome = self.run(&ctx, &cursor, not_found).await;
        let label = match &outcome {
            Ok(Some(_)) => "resolved",
            Ok(None) => "empty",
            Err(DispatchError::NotFound(_)) => "not_found",
            Err(_) => "failed",
        };
        tracing::debug!(path = %path, outcome = label, "Dispatch finished");
        metrics::record_dispatch(label, start);
        outcome
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        cursor: &Arc<Cursor>,
        not_found: bool,
    ) -> DispatchResult<Option<Value>> {
        let result = loop {
            let value = ctx.advance().await?;
            if value.is_some() {
                return Ok(value);
            }
            let outcome = cursor.outcome.lock();
            if outcome.done {
                break outcome.result.clone();
            }
        };

        if result.is_some() {
            return Ok(result);
        }
        let fault = cursor.outcome.lock().fault.take();
        match (fault, not_found) {
            // A chain must not fall through to the service after a handled fault.
            (Some(err), false) => return Err(err),
            (Some(_), true) | (None, false) => return Ok(None),
            (None, true) => {}
        }

        let Some(handler) = cursor.error_route().and_then(|r| r.effective_action()) else {
            return Ok(None);
        };

        tracing::debug!(path = %ctx.path, "No route produced a result, running error route");
        metrics::record_error_route("NotFound");
        let mut not_found = ctx.clone();
        not_found.error = Some(DispatchError::NotFound(ctx.path.clone()));
        invoke(&handler, not_found).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::{action, RouteAction, RouteDef};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: Arc<AtomicUsize>, value: Option<&'static str>) -> RouteAction {
        action(move |_ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(value.map(Value::from))
            }
        })
    }

    fn echo_error() -> RouteAction {
        action(|ctx: RequestContext| async move {
            let err = ctx.error.expect("error route runs with an error");
            Ok(Some(serde_json::json!({
                "status": err.status(),
                "message": err.to_string(),
            })))
        })
    }

    #[tokio::test]
    async fn test_leaf_match_stops_at_result() {
        let hits = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let router = Router::from_routes([
            RouteNode::new(
                "users/:id",
                action(|ctx: RequestContext| async move {
                    Ok(Some(Value::from(format!("user {}", ctx.param("id").unwrap_or("?")))))
                }),
            ),
            RouteNode::new("/users/:id", counting(later.clone(), Some("late"))),
            RouteNode::new("/users/42", counting(hits.clone(), None)),
        ])
        .unwrap();

        let result = router.dispatch_path("/users/42").await.unwrap();
        assert_eq!(result, Some(Value::from("user 42")));
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_found_with_error_route() {
        let router = Router::from_routes([
            RouteNode::new("/users/:id", action(|_ctx| async { Ok(Some(Value::from("user"))) })),
            RouteNode::new("/error", echo_error()),
        ])
        .unwrap();

        let result = router.dispatch_path("/orders/1").await.unwrap().unwrap();
        assert_eq!(result["status"], 404);
        assert_eq!(result["message"], "Not found: /orders/1");
    }

    #[tokio::test]
    async fn test_not_found_without_error_route() {
        let router = Router::from_routes([RouteNode::new(
            "/users/:id",
            action(|_ctx| async { Ok(Some(Value::from("user"))) }),
        )])
        .unwrap();
        assert_eq!(router.dispatch_path("/orders/1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pass_through_continues_into_children() {
        let parent_hits = Arc::new(AtomicUsize::new(0));
        let router = Router::from_routes([RouteDef::new("/api")
            .action(counting(parent_hits.clone(), None))
            .child(RouteNode::new("/ping", action(|_ctx| async { Ok(Some(Value::from("pong"))) })))
            .build()])
        .unwrap();

        let result = router.dispatch_path("/api/ping").await.unwrap();
        assert_eq!(result, Some(Value::from("pong")));
        assert_eq!(parent_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_middleware_can_wrap_children() {
        let router = Router::from_routes([RouteDef::new("/api")
            .action(action(|ctx: RequestContext| async move {
                let inner = ctx.advance().await?;
                Ok(inner.map(|v| serde_json::json!({ "wrapped": v })))
            }))
            .child(RouteNode::new("/ping", action(|_ctx| async { Ok(Some(Value::from("pong"))) })))
            .build()])
        .unwrap();

        let result = router.dispatch_path("/api/ping").await.unwrap().unwrap();
        assert_eq!(result["wrapped"], "pong");
    }

    #[tokio::test]
    async fn test_fault_goes_to_error_route() {
        let router = Router::from_routes([
            RouteNode::new("/boom", action(|_ctx| async { Err(DispatchError::fault("kaboom")) })),
            RouteNode::new("/error", echo_error()),
        ])
        .unwrap();

        let result = router.dispatch_path("/boom").await.unwrap().unwrap();
        assert_eq!(result["status"], 500);
        assert_eq!(result["message"], "kaboom");
    }

    #[tokio::test]
    async fn test_fault_keeps_explicit_status() {
        let router = Router::from_routes([
            RouteNode::new(
                "/gone",
                action(|_ctx| async { Err(DispatchError::fault_with_status("gone", 410)) }),
            ),
            RouteNode::new("/error", echo_error()),
        ])
        .unwrap();

        let result = router.dispatch_path("/gone").await.unwrap().unwrap();
        assert_eq!(result["status"], 410);
    }

    #[tokio::test]
    async fn test_fault_without_error_route_propagates() {
        let router = Router::from_routes([RouteNode::new(
            "/boom",
            action(|_ctx| async { Err(DispatchError::fault("kaboom")) }),
        )])
        .unwrap();

        let err = router.dispatch_path("/boom").await.unwrap_err();
        assert_eq!(err.kind(), "HandlerFault");
    }

    #[tokio::test]
    async fn test_panic_goes_to_error_route() {
        let router = Router::from_routes([
            RouteNode::new(
                "/panic",
                action(|_ctx| async move {
                    if true {
                        panic!("handler exploded");
                    }
                    Ok(None)
                }),
            ),
            RouteNode::new("/error", echo_error()),
        ])
        .unwrap();

        let result = router.dispatch_path("/panic").await.unwrap().unwrap();
        assert_eq!(result["status"], 500);
        assert_eq!(result["message"], "handler exploded");
    }

    #[tokio::test]
    async fn test_handled_fault_does_not_synthesize_not_found() {
        let error_hits = Arc::new(AtomicUsize::new(0));
        let router = Router::from_routes([
            RouteNode::new("/boom", action(|_ctx| async { Err(DispatchError::fault("kaboom")) })),
            RouteNode::new("/error", counting(error_hits.clone(), None)),
        ])
        .unwrap();

        assert_eq!(router.dispatch_path("/boom").await.unwrap(), None);
        assert_eq!(error_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chain_skips_not_found_but_keeps_faults() {
        let error_hits = Arc::new(AtomicUsize::new(0));
        let router = Router::from_routes([
            RouteNode::new("/boom", action(|_ctx| async { Err(DispatchError::fault("kaboom")) })),
            RouteNode::new("/error", counting(error_hits.clone(), None)),
        ])
        .unwrap();

        let quiet = router.dispatch_chain(RequestContext::new("/users")).await.unwrap();
        assert_eq!(quiet, None);
        assert_eq!(error_hits.load(Ordering::SeqCst), 0);

        let err = router.dispatch_chain(RequestContext::new("/boom")).await.unwrap_err();
        assert_eq!(err, DispatchError::fault_with_status("kaboom", 500));
        assert_eq!(error_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_finish_ends_dispatch() {
        let later = Arc::new(AtomicUsize::new(0));
        let router = Router::from_routes([
            RouteNode::new(
                "*",
                action(|ctx: RequestContext| async move {
                    ctx.finish(Value::from("early"));
                    Ok(None)
                }),
            ),
            RouteNode::new("/users", counting(later.clone(), Some("late"))),
        ])
        .unwrap();

        assert_eq!(router.dispatch_path("/users").await.unwrap(), Some(Value::from("early")));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_caller_params_are_merged() {
        let router = Router::from_routes([RouteNode::new(
            "/users/:id",
            action(|ctx: RequestContext| async move { Ok(Some(Value::Object(ctx.params))) }),
        )])
        .unwrap();

        let mut params = serde_json::Map::new();
        params.insert("provider".into(), Value::from("local"));
        params.insert("id".into(), Value::from("caller"));
        let ctx = RequestContext::new("/users/7").with_params(params);

        let result = router.dispatch(ctx).await.unwrap().unwrap();
        assert_eq!(result["provider"], "local");
        assert_eq!(result["id"], "7");
    }

    #[tokio::test]
    async fn test_route_context_reaches_metadata() {
        let router = Router::from_routes([RouteDef::new("/tagged")
            .context("tag", Value::from("blue"))
            .action(action(|ctx: RequestContext| async move {
                Ok(ctx.metadata.get("tag").cloned())
            }))
            .build()])
        .unwrap();

        assert_eq!(router.dispatch_path("/tagged").await.unwrap(), Some(Value::from("blue")));
    }

    #[test]
    fn test_invalid_pattern_rejected_at_build() {
        let err = Router::from_routes([RouteNode::new(
            "/bad/:id([)",
            action(|_ctx| async { Ok(None) }),
        )])
        .unwrap_err();
        assert!(err.to_string().contains("/bad/:id([)"));
    }
}
