//! Route tree nodes and their builder.
//!
//! # Responsibilities
//! - Hold a pattern, an optional action and ordered children per node
//! - Build nodes from an explicit [`RouteDef`] configuration value
//! - Mount one tree under another without copying it
//!
//! # Design Decisions
//! - Children are `Arc`-shared so a mounted subtree stays one structure
//! - A node declared with children (even none yet) is a branch: it matches by
//!   prefix and, without an explicit action, passes through to its children
//! - Trees are mutated only while owned; once frozen into a
//!   [`Router`](crate::routing::Router) they are read-only

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::DispatchResult;
use crate::routing::context::RequestContext;

/// Raw path of the per-level error handler.
pub const ERROR_ROUTE_PATH: &str = "/error";

/// An asynchronous route handler. `Ok(None)` means "no result, keep going".
pub type RouteAction =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, DispatchResult<Option<Value>>> + Send + Sync>;

/// Wrap an async closure as a [`RouteAction`].
pub fn action<F, Fut>(f: F) -> RouteAction
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Option<Value>>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

fn pass_through() -> RouteAction {
    action(|ctx: RequestContext| async move { ctx.advance().await })
}

/// Explicit configuration for a route node.
#[derive(Clone, Default)]
pub struct RouteDef {
    pub path: Option<String>,
    pub context: Map<String, Value>,
    pub action: Option<RouteAction>,
    pub children: Option<Vec<Arc<RouteNode>>>,
}

impl RouteDef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn action(mut self, action: RouteAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn child(mut self, node: RouteNode) -> Self {
        self.children.get_or_insert_with(Vec::new).push(Arc::new(node));
        self
    }

    pub fn children<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = RouteNode>,
    {
        self.children
            .get_or_insert_with(Vec::new)
            .extend(nodes.into_iter().map(Arc::new));
        self
    }

    pub fn build(self) -> RouteNode {
        let raw_path = self.path.unwrap_or_default();
        let path = normalize(&raw_path);
        let branch = self.children.is_some();

        RouteNode {
            is_error: raw_path == ERROR_ROUTE_PATH,
            path,
            context: self.context,
            action: self.action,
            children: self.children.unwrap_or_default(),
            branch,
        }
    }
}

impl From<RouteDef> for RouteNode {
    fn from(def: RouteDef) -> Self {
        def.build()
    }
}

/// A node in the route tree.
pub struct RouteNode {
    path: String,
    context: Map<String, Value>,
    action: Option<RouteAction>,
    children: Vec<Arc<RouteNode>>,
    branch: bool,
    is_error: bool,
}

impl RouteNode {
    /// A leaf node with an action.
    pub fn new(path: impl Into<String>, action: RouteAction) -> Self {
        RouteDef::new(path).action(action).build()
    }

    /// An empty branch at `/`.
    pub fn root() -> Self {
        RouteDef::new("/").children(Vec::new()).build()
    }

    /// A branch at `/` holding `routes`.
    pub fn from_routes<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = RouteNode>,
    {
        RouteDef::new("/").children(routes).build()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn children(&self) -> &[Arc<RouteNode>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        !self.branch
    }

    pub fn is_error_route(&self) -> bool {
        self.is_error
    }

    pub fn has_explicit_action(&self) -> bool {
        self.action.is_some()
    }

    /// The action to run for this node: the declared one, or a pass-through
    /// to the children for branches without one.
    pub fn effective_action(&self) -> Option<RouteAction> {
        match &self.action {
            Some(action) => Some(action.clone()),
            None if self.branch => Some(pass_through()),
            None => None,
        }
    }

    /// The first `/error` child at this level.
    pub fn error_route(&self) -> Option<Arc<RouteNode>> {
        self.children.iter().find(|c| c.is_error_route()).cloned()
    }

    pub fn push(&mut self, node: RouteNode) -> &mut Self {
        self.push_shared(Arc::new(node))
    }

    pub fn push_shared(&mut self, node: Arc<RouteNode>) -> &mut Self {
        self.branch = true;
        self.children.push(node);
        self
    }

    /// Attach `subtree` under `prefix`.
    ///
    /// A subtree with children contributes them (shared, not copied) to a new
    /// pass-through node at `prefix`; a childless subtree is wrapped whole.
    pub fn mount(&mut self, prefix: &str, subtree: RouteNode) -> &mut Self {
        let prefix = if prefix.is_empty() { "/" } else { prefix };
        let def = RouteDef::new(prefix).context("mountpath", Value::String(prefix.to_string()));

        let node = if subtree.branch && !subtree.children.is_empty() {
            let mut node = def.children(Vec::new()).build();
            node.children = subtree.children;
            node
        } else {
            def.child(subtree).build()
        };

        tracing::debug!(prefix, children = node.children.len(), "Mounted route subtree");
        self.push(node)
    }

    /// Visit every node depth-first with its depth.
    pub fn walk<F>(&self, f: &mut F)
    where
        F: FnMut(&RouteNode, usize),
    {
        self.walk_at(0, f);
    }

    fn walk_at<F>(&self, depth: usize, f: &mut F)
    where
        F: FnMut(&RouteNode, usize),
    {
        f(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, f);
        }
    }
}

/// Patterns are never empty and are anchored at `/` unless they open with a
/// wildcard or group.
fn normalize(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with(['/', '*', '(']) {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteNode")
            .field("path", &self.path)
            .field("branch", &self.branch)
            .field("is_error", &self.is_error)
            .field("has_action", &self.action.is_some())
            .field("children", &self.children)
            .finish()
    }
}

impl fmt::Display for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = Ok(());
        self.walk(&mut |node, depth| {
            if result.is_err() {
                return;
            }
            let kind = match (node.is_error, node.branch, node.action.is_some()) {
                (true, _, _) => "error",
                (_, true, false) => "pass",
                (_, _, true) => "action",
                _ => "empty",
            };
            result = writeln!(f, "{:indent$}{} [{}]", "", node.path, kind, indent = depth * 2);
        });
        result
    }
}
