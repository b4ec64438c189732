use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const VALUE_KEY: &str = "value";

/// Mutable state of one instance: a `value` entry plus attribute overrides
/// that are reflected onto the view node on every render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateRecord(Map<String, Value>);

impl Default for StateRecord {
    fn default() -> Self {
        Self::empty()
    }
}

impl StateRecord {
    pub fn new(value: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(VALUE_KEY.to_string(), value.into());
        Self(map)
    }

    /// `{ value: "" }`
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Wraps `map` as-is. Callers that accept arbitrary input should prefer
    /// [`StateRecord::canonical`].
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Keeps every entry of `map` but forces `value` to a string or number,
    /// falling back to `""`.
    pub fn canonical(mut map: Map<String, Value>) -> Self {
        let valid = map.get(VALUE_KEY).is_some_and(is_valid_value);
        if !valid {
            map.insert(VALUE_KEY.to_string(), Value::from(""));
        }
        Self(map)
    }

    pub fn value(&self) -> Option<&Value> {
        self.0.get(VALUE_KEY)
    }

    /// The value as attribute text.
    pub fn value_text(&self) -> String {
        self.value().map(attribute_text).unwrap_or_default()
    }

    pub fn is_empty_value(&self) -> bool {
        matches!(self.value(), Some(Value::String(s)) if s.is_empty())
    }

    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.0.insert(VALUE_KEY.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same keys, every value replaced by `""`.
    pub fn blanked(&self) -> Self {
        Self(
            self.0
                .keys()
                .map(|k| (k.clone(), Value::from("")))
                .collect(),
        )
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<&str> for StateRecord {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StateRecord {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Map<String, Value>> for StateRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self::canonical(map)
    }
}

/// Strings and numbers are the only values an instance can hold.
pub fn is_valid_value(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_))
}

/// Immutable attributes of an instance, set once at creation. Keys starting
/// with `_` are private: kept on the instance, never reflected on its node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_private(key: &str) -> bool {
        key.starts_with('_')
    }

    /// Entries that end up as node attributes.
    pub fn reflected(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().filter(|(k, _)| !Self::is_private(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Properties {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Text form of a value when it is set as a node attribute.
pub fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Group key to the states of its instances, in registry order. Group order
/// is insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(IndexMap<String, Vec<StateRecord>>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group_key: impl Into<String>, states: Vec<StateRecord>) {
        self.0.insert(group_key.into(), states);
    }

    pub fn group(&self, group_key: &str) -> Option<&[StateRecord]> {
        self.0.get(group_key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[StateRecord])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_group(mut self, group_key: &str) -> Option<Vec<StateRecord>> {
        self.0.shift_remove(group_key)
    }
}

impl FromIterator<(String, Vec<StateRecord>)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Vec<StateRecord>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
