//! Call parameters and arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::service::Method;

/// Query key carrying an embedded action marker.
pub const QUERY_ACTION_KEY: &str = "$action";

/// Parameters travelling with every service call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub query: Map<String, Value>,

    /// Explicit action marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Name of the transport the call came through, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, name: impl Into<String>) -> Self {
        self.action = Some(name.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    /// The requested action: `action` wins over the query marker. Empty
    /// markers count as absent.
    pub fn action_marker(&self) -> Option<&str> {
        self.action
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.query
                    .get(QUERY_ACTION_KEY)
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
            })
    }

    /// Remove every action marker so handlers never see dispatch metadata.
    pub fn strip_action(&mut self) {
        self.action = None;
        self.query.remove(QUERY_ACTION_KEY);
    }

    /// Flatten into a JSON object for route contexts.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// The identifier of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Id {
    /// A single record.
    Key(String),
    /// Explicit multi-target (`null`) for bulk update/patch/remove.
    All,
}

impl Id {
    pub fn key(&self) -> Option<&str> {
        match self {
            Id::Key(key) => Some(key),
            Id::All => None,
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Id::All,
            Value::String(s) => Id::Key(s.clone()),
            other => Id::Key(other.to_string()),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Id::Key(key) => Value::String(key.clone()),
            Id::All => Value::Null,
        }
    }
}

impl From<&str> for Id {
    fn from(key: &str) -> Self {
        Id::Key(key.to_string())
    }
}

impl From<String> for Id {
    fn from(key: String) -> Self {
        Id::Key(key)
    }
}

/// One CRUD invocation: `id` is `None` when the caller left it undefined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceCall {
    pub id: Option<Id>,
    pub data: Option<Value>,
    pub params: Params,
}

impl ServiceCall {
    pub fn new(id: Option<Id>, data: Option<Value>, params: Params) -> Self {
        Self { id, data, params }
    }

    /// Normalize positional transport arguments for `method`.
    ///
    /// `find: []`, `get/remove: [id]`, `create: [data]`, `update/patch: [id, data]`.
    pub fn from_args(method: Method, args: &[Value], params: Params) -> Self {
        let (id, data) = match method {
            Method::Find => (None, None),
            Method::Get | Method::Remove => (args.first().map(Id::from_value), None),
            Method::Create => (None, args.first().cloned()),
            Method::Update | Method::Patch => (args.first().map(Id::from_value), args.get(1).cloned()),
        };
        Self { id, data, params }
    }

    /// Positional arguments for `method`, the inverse of [`from_args`](Self::from_args).
    ///
    /// An undefined id is sent as no argument at all.
    pub fn to_args(&self, method: Method) -> Vec<Value> {
        let id = self.id.as_ref().map(Id::to_value);
        let data = || self.data.clone().unwrap_or(Value::Null);
        match method {
            Method::Find => Vec::new(),
            Method::Get | Method::Remove => id.into_iter().collect(),
            Method::Create => vec![data()],
            Method::Update | Method::Patch => match id {
                Some(id) => vec![id, data()],
                None => Vec::new(),
            },
        }
    }
}
