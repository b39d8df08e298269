//! Process-wide state shared by every application.

use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Shared handle passed to application constructors.
pub type SharedState = Arc<State>;

/// A concurrent key/value map of JSON values.
///
/// Individual operations are atomic; sequences of operations are not, so
/// handlers that need read-modify-write use [`State::update`].
#[derive(Debug, Default)]
pub struct State {
    values: DashMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    /// Read `key` and deserialize it; `None` when absent or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|value| serde_json::from_value(value).ok())
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Serialize) -> Result<Option<Value>, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        Ok(self.values.insert(key.into(), value))
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.remove(key).map(|(_, value)| value)
    }

    /// Atomically replace the value under `key` (`Value::Null` when absent)
    /// with the result of `f`, returning the new value.
    pub fn update<F>(&self, key: &str, f: F) -> Value
    where
        F: FnOnce(&Value) -> Value,
    {
        let mut entry = self.values.entry(key.to_string()).or_insert(Value::Null);
        let next = f(entry.value());
        *entry.value_mut() = next.clone();
        next
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
