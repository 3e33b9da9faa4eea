//! In-process transport.

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::TransportConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::observability::metrics;
use crate::transport::{Pattern, Request, Transport, TransportHandler};

/// Status reported when a request exceeds the transport timeout.
pub const TIMEOUT_STATUS: u16 = 408;

/// Dispatches requests to handlers in the same process.
#[derive(Clone, Default)]
pub struct LocalTransport {
    handlers: Arc<DashMap<Pattern, TransportHandler>>,
    timeout: Option<Duration>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        let transport = Self::new();
        match config.request_timeout() {
            Some(timeout) => transport.with_timeout(timeout),
            None => transport,
        }
    }

    /// Fail requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn has_handler(&self, pattern: &Pattern) -> bool {
        self.handlers.contains_key(pattern)
    }
}

impl Transport for LocalTransport {
    fn add(&self, pattern: Pattern, handler: TransportHandler) {
        tracing::debug!(pattern = %pattern, "Registered transport handler");
        self.handlers.insert(pattern, handler);
    }

    fn act(&self, request: Request) -> BoxFuture<'static, DispatchResult<Value>> {
        let pattern = request.pattern();
        let handler = self.handlers.get(&pattern).map(|h| h.value().clone());
        let timeout = self.timeout;
        let span = tracing::info_span!("act", request_id = %Uuid::new_v4(), pattern = %pattern);

        async move {
            let start = Instant::now();
            let Some(handler) = handler else {
                tracing::warn!("No handler registered");
                metrics::record_transport_request(&pattern.topic, pattern.cmd.as_str(), "unrouted", start);
                return Err(DispatchError::NotFound(format!("no handler for {pattern}")));
            };

            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, handler(request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(DispatchError::fault_with_status(
                        format!("Request timeout after {} ms", limit.as_millis()),
                        TIMEOUT_STATUS,
                    )),
                },
                None => handler(request).await,
            };

            match &outcome {
                Ok(_) => tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Request completed"),
                Err(e) => tracing::debug!(error = %e, kind = e.kind(), "Request failed"),
            }
            let label = if outcome.is_ok() { "ok" } else { "error" };
            metrics::record_transport_request(&pattern.topic, pattern.cmd.as_str(), label, start);
            outcome
        }
        .instrument(span)
        .boxed()
    }
}
