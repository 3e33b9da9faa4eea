//! Application settings.

use serde_json::{Map, Value};

/// Free-form application settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn enable(&mut self, name: impl Into<String>) {
        self.set(name, Value::Bool(true));
    }

    pub fn disable(&mut self, name: impl Into<String>) {
        self.set(name, Value::Bool(false));
    }

    /// True when the setting holds a truthy value.
    pub fn enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(truthy)
    }

    pub fn disabled(&self, name: &str) -> bool {
        !self.enabled(name)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
