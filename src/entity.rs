//! Runtime record types.
//!
//! An [`EntityData`] is one logical row: a sparse, insertion-ordered map from
//! attribute id to value. A row may span several entities of a model when their
//! attributes co-occur. A [`Payload`] is the ordered batch of rows a data
//! message carries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the value of a single attribute in a record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    /// Integers above `i64::MAX`
    UInt(u64),
    Float(f64),
    Bool(bool),
    List(Vec<FieldValue>),
    Map(IndexMap<String, FieldValue>),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::List(l) => write!(f, "{:?}", l),
            FieldValue::Map(m) => write!(f, "{:?}", m),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        json_value_to_field_value(value)
    }
}

/// Helper function to convert serde_json::Value to FieldValue
fn json_value_to_field_value(value: serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::String(s) => FieldValue::String(s),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                FieldValue::UInt(u)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::Null
            }
        }
        serde_json::Value::Bool(b) => FieldValue::Bool(b),
        serde_json::Value::Array(arr) => {
            FieldValue::List(arr.into_iter().map(json_value_to_field_value).collect())
        }
        serde_json::Value::Null => FieldValue::Null,
        serde_json::Value::Object(map) => FieldValue::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_value_to_field_value(v)))
                .collect(),
        ),
    }
}

/// One record: attribute id -> value.
///
/// A key holding [`FieldValue::Null`] is present with a null value, which is
/// distinct from the key being absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityData {
    values: IndexMap<String, FieldValue>,
}

impl EntityData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of an attribute, returning the previous value if any.
    pub fn put(&mut self, attribute_id: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.values.insert(attribute_id.into(), value.into())
    }

    pub fn get(&self, attribute_id: &str) -> Option<&FieldValue> {
        self.values.get(attribute_id)
    }

    pub fn contains_attribute(&self, attribute_id: &str) -> bool {
        self.values.contains_key(attribute_id)
    }

    pub fn remove(&mut self, attribute_id: &str) -> Option<FieldValue> {
        self.values.shift_remove(attribute_id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (attribute id, value) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    pub fn attribute_ids(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

impl FromIterator<(String, FieldValue)> for EntityData {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Ordered batch of records carried by a data message.
pub type Payload = Vec<EntityData>;
