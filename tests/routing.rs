//! Route tree dispatch through the public API.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use service_router::routing::{compile, MatchFrame, RouteIter};
use service_router::{action, RequestContext, RouteDef, RouteNode, Router};

fn frame_key(frame: &MatchFrame) -> (usize, String, String, BTreeMap<String, String>) {
    (
        Arc::as_ptr(&frame.node) as usize,
        frame.base_url.clone(),
        frame.path.clone(),
        frame.params.clone(),
    )
}

#[tokio::test]
async fn test_single_leaf_match_invokes_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let router = Router::from_routes([RouteNode::new(
        "users/:id",
        action(move |ctx: RequestContext| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(json!({ "id": ctx.param("id") })))
            }
        }),
    )])
    .unwrap();

    let frames: Vec<_> = router.matches("/users/42").skip(1).collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].params.get("id").map(String::as_str), Some("42"));

    let result = router.dispatch_path("/users/42").await.unwrap();
    assert_eq!(result, Some(json!({ "id": "42" })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unmatched_path_reaches_error_route() {
    let router = Router::from_routes([
        RouteNode::new("users/:id", action(|_ctx| async { Ok(Some(json!("user"))) })),
        RouteNode::new(
            "/error",
            action(|ctx: RequestContext| async move {
                Ok(ctx.error.map(|e| json!({ "status": e.status(), "kind": e.kind() })))
            }),
        ),
    ])
    .unwrap();

    let result = router.dispatch_path("/orders/1").await.unwrap();
    assert_eq!(result, Some(json!({ "status": 404, "kind": "NotFound" })));
}

#[tokio::test]
async fn test_pass_through_parent_reaches_children() {
    let parent = Arc::new(AtomicUsize::new(0));
    let seen = parent.clone();
    let router = Router::from_routes([RouteDef::new("/shop")
        .action(action(move |_ctx| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
        }))
        .child(RouteNode::new(
            "/items/:sku",
            action(|ctx: RequestContext| async move {
                Ok(Some(json!({ "sku": ctx.param("sku"), "base": ctx.base_url })))
            }),
        ))
        .build()])
    .unwrap();

    let result = router.dispatch_path("/shop/items/a%20b").await.unwrap();
    assert_eq!(result, Some(json!({ "sku": "a b", "base": "/shop" })));
    assert_eq!(parent.load(Ordering::SeqCst), 1);
}

#[test]
fn test_compiled_patterns_agree() {
    let first = compile("users/:id", true).unwrap();
    let second = compile("users/:id", true).unwrap();
    assert_eq!(first.match_path("/users/42"), second.match_path("/users/42"));
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_mount_is_equivalent_to_base_url() {
    let leaves = vec![
        Arc::new(RouteNode::new("/list", action(|_ctx| async { Ok(None) }))),
        Arc::new(
            RouteDef::new("/items")
                .child(RouteNode::new("/:sku", action(|_ctx| async { Ok(None) })))
                .build(),
        ),
    ];

    let mut mounted = RouteNode::root();
    for leaf in &leaves {
        mounted.push_shared(leaf.clone());
    }
    let mut direct = RouteNode::root();
    for leaf in &leaves {
        direct.push_shared(leaf.clone());
    }

    let mut combined = RouteNode::root();
    combined.mount("/api", mounted);
    let router = Router::new(combined).unwrap();
    let direct = Arc::new(direct);

    for q in ["/list", "/items/42", "/missing"] {
        // Combined tree yields root and mount frames before the subtree's own.
        let via_mount: Vec<_> = router
            .matches(&format!("/api{q}"))
            .skip(2)
            .map(|f| frame_key(&f))
            .collect();
        let via_base: Vec<_> = RouteIter::new(direct.clone(), "/api", q)
            .skip(1)
            .map(|f| frame_key(&f))
            .collect();
        assert_eq!(via_mount, via_base, "frames differ for {q}");
    }
}

#[tokio::test]
async fn test_concurrent_dispatches_are_independent() {
    let router = Arc::new(
        Router::from_routes([RouteNode::new(
            "/echo/:n",
            action(|ctx: RequestContext| async move {
                tokio::task::yield_now().await;
                Ok(ctx.param("n").map(|n| Value::String(n.to_string())))
            }),
        )])
        .unwrap(),
    );

    let handles: Vec<_> = (0..32)
        .map(|n| {
            let router = router.clone();
            tokio::spawn(async move { (n, router.dispatch_path(&format!("/echo/{n}")).await) })
        })
        .collect();

    for handle in handles {
        let (n, result) = handle.await.unwrap();
        assert_eq!(result.unwrap(), Some(Value::String(n.to_string())));
    }
}
