//! In-memory record store.
//!
//! Reference [`Service`] used by the binary and the integration tests.
//! Records are JSON objects keyed by their `id` field; removed records move to
//! a trash bin from which the `restore` action brings them back.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{DispatchError, DispatchResult};
use crate::service::action::{ActionArgs, ActionTable};
use crate::service::api::Service;
use crate::service::params::Params;

const ID_FIELD: &str = "id";

/// Thread-safe in-memory record store.
#[derive(Debug, Default)]
pub struct MemoryService {
    records: DashMap<String, Value>,
    trash: DashMap<String, Value>,
    next_id: AtomicU64,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records matching every plain key in `query`, ordered by id.
    fn matching(&self, query: &Map<String, Value>) -> Vec<Value> {
        let mut found: Vec<(String, Value)> = self
            .records
            .iter()
            .filter(|r| matches_query(r.value(), query))
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        found.sort_by(|a, b| (a.0.len(), &a.0).cmp(&(b.0.len(), &b.0)));

        let limit = query.get("$limit").and_then(Value::as_u64).map(|l| l as usize);
        found
            .into_iter()
            .map(|(_, v)| v)
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    fn lookup(&self, id: &str) -> DispatchResult<Value> {
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| DispatchError::NotFound(format!("No record found for id '{id}'")))
    }

    fn keys(&self, id: Option<String>) -> Vec<String> {
        match id {
            Some(id) => vec![id],
            None => {
                let mut keys: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
                keys.sort_by(|a, b| (a.len(), a).cmp(&(b.len(), b)));
                keys
            }
        }
    }

    fn write_all<F>(&self, id: Option<String>, write: F) -> DispatchResult<Value>
    where
        F: Fn(&str, &Value) -> DispatchResult<Value>,
    {
        let multi = id.is_none();
        let mut out = Vec::new();
        for key in self.keys(id) {
            let current = self.lookup(&key)?;
            let next = write(&key, &current)?;
            self.records.insert(key, next.clone());
            out.push(next);
        }
        Ok(if multi { Value::Array(out) } else { out.pop().unwrap_or(Value::Null) })
    }

    fn restore(&self, key: &str) -> DispatchResult<Value> {
        let (key, record) = self
            .trash
            .remove(key)
            .ok_or_else(|| DispatchError::NotFound(format!("No removed record for id '{key}'")))?;
        self.records.insert(key, record.clone());
        Ok(record)
    }
}

fn matches_query(record: &Value, query: &Map<String, Value>) -> bool {
    query
        .iter()
        .filter(|(k, _)| !k.starts_with('$'))
        .all(|(k, v)| record.get(k) == Some(v))
}

fn as_object(data: Value) -> DispatchResult<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(DispatchError::fault_with_status(
            format!("Record data must be an object, got {other}"),
            400,
        )),
    }
}

#[async_trait]
impl Service for MemoryService {
    async fn find(&self, params: Params) -> DispatchResult<Value> {
        Ok(Value::Array(self.matching(&params.query)))
    }

    async fn get(&self, id: String, _params: Params) -> DispatchResult<Value> {
        self.lookup(&id)
    }

    async fn create(&self, data: Value, _params: Params) -> DispatchResult<Value> {
        let mut record = as_object(data)?;
        let id = match record.get(ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string(),
        };
        record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        let record = Value::Object(record);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: Option<String>, data: Value, _params: Params) -> DispatchResult<Value> {
        let data = as_object(data)?;
        self.write_all(id, |key, _current| {
            let mut next = data.clone();
            next.insert(ID_FIELD.to_string(), Value::String(key.to_string()));
            Ok(Value::Object(next))
        })
    }

    async fn patch(&self, id: Option<String>, data: Value, _params: Params) -> DispatchResult<Value> {
        let data = as_object(data)?;
        self.write_all(id, |key, current| {
            let mut next = as_object(current.clone())?;
            for (k, v) in &data {
                next.insert(k.clone(), v.clone());
            }
            next.insert(ID_FIELD.to_string(), Value::String(key.to_string()));
            Ok(Value::Object(next))
        })
    }

    async fn remove(&self, id: Option<String>, _params: Params) -> DispatchResult<Value> {
        let multi = id.is_none();
        let mut removed = Vec::new();
        for key in self.keys(id) {
            let (key, record) = self
                .records
                .remove(&key)
                .ok_or_else(|| DispatchError::NotFound(format!("No record found for id '{key}'")))?;
            self.trash.insert(key, record.clone());
            removed.push(record);
        }
        Ok(if multi { Value::Array(removed) } else { removed.pop().unwrap_or(Value::Null) })
    }

    fn actions() -> ActionTable<Self> {
        ActionTable::new()
            .on("count", |svc: Arc<MemoryService>, args: ActionArgs| async move {
                Ok(Value::from(svc.matching(&args.params().query).len()))
            })
            .on("restore", |svc: Arc<MemoryService>, args: ActionArgs| async move {
                let key = args
                    .id()
                    .map(str::to_string)
                    .or_else(|| match args.params().query.get(ID_FIELD) {
                        Some(Value::String(id)) => Some(id.clone()),
                        Some(Value::Null) | None => None,
                        Some(other) => Some(other.to_string()),
                    })
                    .ok_or_else(|| DispatchError::fault_with_status("restore needs an id", 400))?;
                svc.restore(&key)
            })
    }

    fn setup(&self, location: &str) {
        tracing::info!(location, "Memory service ready");
    }
}
