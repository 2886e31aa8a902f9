//! Hierarchical options addressed by dot-separated key paths
//!
//! `Options` is the configuration tree shared by queues, items and loaders.
//! Paths such as `attributes.crossorigin` walk nested objects; intermediate
//! objects are created on write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ConfigurationError;

/// Key-path addressable configuration tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    data: Map<String, Value>,
}

impl Options {
    /// Create an empty options tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from a JSON value, which must be an object (or null)
    pub fn from_value(value: Value) -> Result<Self, ConfigurationError> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            Value::Null => Ok(Self::default()),
            other => Err(ConfigurationError::InvalidOptions(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    /// Builder-style `set`
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    /// Check whether a value exists at `path`
    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Get the value at `path`
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Get a string value at `path`
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Get a boolean-like value at `path`
    ///
    /// Accepts JSON booleans plus the strings `"true"`/`"false"` and numbers
    /// (non-zero is true), matching how loosely typed manifests express flags.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        match self.get(path)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" | "" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        }
    }

    /// Set `value` at `path`, creating intermediate objects
    ///
    /// Non-object intermediates are replaced by objects.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let segments: Vec<&str> = path.split('.').collect();
        insert_path(&mut self.data, &segments, value.into());
    }

    /// Set `value` at `path` only if nothing is there yet
    ///
    /// Returns true when the default was applied.
    pub fn define(&mut self, path: &str, default: impl Into<Value>) -> bool {
        if self.has(path) {
            return false;
        }
        self.set(path, default);
        true
    }

    /// Remove and return the value at `path`
    pub fn pull(&mut self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        remove_path(&mut self.data, &segments)
    }

    /// Append `value` at `path`
    ///
    /// An absent path receives the value as-is, an array gets it appended and
    /// any other existing value is turned into a two-element array.
    pub fn push(&mut self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        let merged = match self.pull(path) {
            None => value,
            Some(Value::Array(mut items)) => {
                items.push(value);
                Value::Array(items)
            }
            Some(existing) => Value::Array(vec![existing, value]),
        };
        self.set(path, merged);
    }

    /// Deep-merge `overlay` into self; values from `overlay` win
    pub fn merge(&mut self, overlay: &Options) {
        merge_maps(&mut self.data, &overlay.data);
    }

    /// Resolve effective options: `defaults` overridden by `local`
    pub fn resolve(defaults: &Options, local: &Options) -> Options {
        debug!("Options::resolve: called");
        let mut resolved = defaults.clone();
        resolved.merge(local);
        resolved
    }

    /// Iterate over the key/value pairs of the object at `path`
    ///
    /// Yields nothing when `path` is absent or not an object. An empty path
    /// iterates the root.
    pub fn iter<'a>(&'a self, path: &str) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let map = if path.is_empty() {
            Some(&self.data)
        } else {
            self.get(path).and_then(Value::as_object)
        };
        map.into_iter().flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Check whether the tree is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Convert into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

fn remove_path(map: &mut Map<String, Value>, segments: &[&str]) -> Option<Value> {
    match segments {
        [] => None,
        [last] => map.remove(*last),
        [head, rest @ ..] => map
            .get_mut(*head)?
            .as_object_mut()
            .and_then(|child| remove_path(child, rest)),
    }
}

fn merge_maps(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_maps(existing, incoming),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

impl From<Map<String, Value>> for Options {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}
