//! Request/response transport boundary.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     Application::start → add({topic, cmd}, handler) per service verb
//!
//! Call:
//!     ProxyService / caller → act(Request{topic, cmd, args, params})
//!     → handler(Request) → Result<Value, DispatchError>
//! ```
//!
//! # Design Decisions
//! - The core never performs I/O; transports only deliver requests to handlers
//! - Timeouts belong to the transport, not the dispatcher
//! - Handlers are keyed by exact (topic, verb)

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::DispatchResult;
use crate::service::{Method, Params};

pub mod local;

pub use local::LocalTransport;

/// Address of a handler: service topic plus verb.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    pub topic: String,
    pub cmd: Method,
}

impl Pattern {
    pub fn new(topic: impl Into<String>, cmd: Method) -> Self {
        Self {
            topic: topic.into(),
            cmd,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.topic, self.cmd)
    }
}

/// One request travelling through a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub topic: String,
    pub cmd: Method,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub params: Params,
}

impl Request {
    pub fn pattern(&self) -> Pattern {
        Pattern::new(self.topic.clone(), self.cmd)
    }
}

/// A registered request handler.
pub type TransportHandler =
    Arc<dyn Fn(Request) -> BoxFuture<'static, DispatchResult<Value>> + Send + Sync>;

/// Wrap an async closure as a [`TransportHandler`].
pub fn handler<F, Fut>(f: F) -> TransportHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Value>> + Send + 'static,
{
    Arc::new(move |req| f(req).boxed())
}

/// Delivers requests to registered handlers.
pub trait Transport: Send + Sync + 'static {
    /// Register `handler` for `pattern`, replacing any previous one.
    fn add(&self, pattern: Pattern, handler: TransportHandler);

    /// Deliver `request` and wait for its outcome.
    fn act(&self, request: Request) -> BoxFuture<'static, DispatchResult<Value>>;
}
