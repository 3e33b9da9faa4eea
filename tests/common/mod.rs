//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use service_router::service::{ActionArgs, MemoryService};
use service_router::{
    ActionTable, App, Application, DispatchResult, LocalTransport, Params, Service,
};

/// Wraps the memory store and adds a prefetched `archive` action plus a slow `find`.
pub struct Ledger {
    store: MemoryService,
    delay: Duration,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            store: MemoryService::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            store: MemoryService::new(),
            delay,
        }
    }
}

#[async_trait]
impl Service for Ledger {
    async fn find(&self, params: Params) -> DispatchResult<Value> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.store.find(params).await
    }

    async fn get(&self, id: String, params: Params) -> DispatchResult<Value> {
        self.store.get(id, params).await
    }

    async fn create(&self, data: Value, params: Params) -> DispatchResult<Value> {
        self.store.create(data, params).await
    }

    async fn patch(&self, id: Option<String>, data: Value, params: Params) -> DispatchResult<Value> {
        self.store.patch(id, data, params).await
    }

    fn actions() -> ActionTable<Self> {
        ActionTable::new()
            .on_prefetched("archive", |svc: Arc<Ledger>, args: ActionArgs| async move {
                let origin = args.origin().cloned().unwrap_or(Value::Null);
                let id = args.id().map(str::to_string);
                let archived = svc.store.patch(id, json!({ "archived": true }), Params::new()).await?;
                Ok(json!({ "before": origin, "after": archived }))
            })
            .on("echo", |_svc: Arc<Ledger>, args: ActionArgs| async move {
                Ok(json!({
                    "id": args.id(),
                    "data": args.data(),
                    "params": args.params().to_map(),
                }))
            })
    }
}

/// App on domain `test` with a memory store at `records` and a ledger at `ledger`.
pub fn start_app() -> App<LocalTransport> {
    Application::new(LocalTransport::new(), "test")
        .service("records", MemoryService::new())
        .service("ledger", Ledger::new())
        .start()
        .expect("valid routes")
}

/// Seed `records` through the transport.
pub async fn seed(app: &App<LocalTransport>, records: Value) {
    use service_router::ServiceApi;
    app.service("records")
        .create(records, Params::new())
        .await
        .expect("seed records");
}
