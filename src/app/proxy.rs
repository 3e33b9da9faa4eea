//! Client-side service over a transport.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{DispatchError, DispatchResult};
use crate::service::{Method, ServiceApi, ServiceCall};
use crate::transport::{Request, Transport};

/// Speaks [`ServiceApi`] to a service registered under `<domain>.<name>`.
pub struct ProxyService<T> {
    name: String,
    topic: String,
    transport: Arc<T>,
}

impl<T: Transport> ProxyService<T> {
    pub fn new(domain: &str, name: &str, transport: Arc<T>) -> Self {
        let name = name.trim_matches('/').to_string();
        let topic = format!("{}.{}", domain.trim_matches('/'), name);
        Self {
            name,
            topic,
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl<T: Transport> ServiceApi for ProxyService<T> {
    async fn call(&self, method: Method, call: ServiceCall) -> DispatchResult<Value> {
        if method.takes_id() && call.id.is_none() {
            return Err(DispatchError::MissingIdentifier { verb: method });
        }

        let request = Request {
            topic: self.topic.clone(),
            cmd: method,
            args: call.to_args(method),
            params: call.params,
        };
        tracing::debug!(topic = %self.topic, cmd = %method, "Proxy request");
        self.transport.act(request).await
    }
}
