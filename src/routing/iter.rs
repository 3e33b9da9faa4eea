//! Lazy depth-first route matching.
//!
//! # Traversal Rules
//! ```text
//! leaf node:    exact match once → yield frame → done
//! branch node:  prefix match once → yield own frame
//!               → for each child in order: strip matched prefix,
//!                 iterate child until exhausted
//!               → done
//! no match:     done immediately, subtree pruned
//! ```
//!
//! Frames are produced one per `next()` call; nothing past the current frame
//! is computed, so the dispatcher can stop early for free.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::routing::pattern::{self, PathMatch};
use crate::routing::route::RouteNode;

/// One successful match of a path against a route node.
#[derive(Debug, Clone)]
pub struct MatchFrame {
    pub node: Arc<RouteNode>,
    pub base_url: String,
    /// Prefix of the residual path consumed by this node.
    pub path: String,
    pub params: BTreeMap<String, String>,
}

enum State {
    Fresh,
    Matched(PathMatch),
    Done,
}

/// Resumable depth-first iterator over the frames matching a path.
pub struct RouteIter {
    node: Arc<RouteNode>,
    base_url: String,
    path: String,
    state: State,
    child_idx: usize,
    child: Option<Box<RouteIter>>,
}

impl RouteIter {
    pub fn new(node: Arc<RouteNode>, base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            node,
            base_url: base_url.into(),
            path: path.into(),
            state: State::Fresh,
            child_idx: 0,
            child: None,
        }
    }

    fn try_match(&self) -> Option<PathMatch> {
        let exact = self.node.is_leaf();
        match pattern::match_path(self.node.path(), exact, &self.path) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping route with invalid pattern");
                None
            }
        }
    }

    fn frame(&self, matched: &PathMatch) -> MatchFrame {
        MatchFrame {
            node: self.node.clone(),
            base_url: self.base_url.clone(),
            path: matched.path.clone(),
            params: matched.params.clone(),
        }
    }

    fn next_child(&mut self, matched: &PathMatch) -> Option<MatchFrame> {
        let children = self.node.children();
        while self.child_idx < children.len() {
            if self.child.is_none() {
                let residual = self.path.get(matched.path.len()..).unwrap_or("");
                let residual = if residual.starts_with('/') {
                    residual.to_string()
                } else {
                    format!("/{residual}")
                };
                let base_url = if matched.path == "/" {
                    self.base_url.clone()
                } else {
                    format!("{}{}", self.base_url, matched.path)
                };
                self.child = Some(Box::new(RouteIter::new(
                    children[self.child_idx].clone(),
                    base_url,
                    residual,
                )));
            }

            match self.child.as_mut().and_then(|c| c.next()) {
                Some(frame) => return Some(frame),
                None => {
                    self.child_idx += 1;
                    self.child = None;
                }
            }
        }
        None
    }
}

impl Iterator for RouteIter {
    type Item = MatchFrame;

    fn next(&mut self) -> Option<MatchFrame> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Fresh => {
                let matched = self.try_match()?;
                let frame = self.frame(&matched);
                self.state = State::Matched(matched);
                Some(frame)
            }
            State::Matched(matched) => {
                if self.node.is_leaf() {
                    return None;
                }
                let frame = self.next_child(&matched);
                if frame.is_some() {
                    self.state = State::Matched(matched);
                }
                frame
            }
            State::Done => None,
        }
    }
}
