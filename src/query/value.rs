//! Tagged value produced by query/form decoding.

use indexmap::IndexMap;
use serde::Serialize;

/// A decoded query value.
///
/// Serializes to the natural JSON shape (`"x"`, `true`, `null`, `[..]`, `{..}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Null,
    Bool(bool),
    String(String),
    Seq(Vec<QueryValue>),
    Map(IndexMap<String, QueryValue>),
}

impl QueryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            QueryValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[QueryValue]> {
        match self {
            QueryValue::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, QueryValue>> {
        match self {
            QueryValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }

    /// Look up a key when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::String(value.to_string())
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<QueryValue> for serde_json::Value {
    fn from(value: QueryValue) -> Self {
        match value {
            QueryValue::Null => serde_json::Value::Null,
            QueryValue::Bool(b) => serde_json::Value::Bool(b),
            QueryValue::String(s) => serde_json::Value::String(s),
            QueryValue::Seq(items) => items.into_iter().map(serde_json::Value::from).collect(),
            QueryValue::Map(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, serde_json::Value::from(v))).collect(),
            ),
        }
    }
}
