//! Exportable values
//!
//! The closed set of value shapes a script binding may carry into a response.
//! Anything the engine produces outside this set (function pointers, blobs,
//! timestamps, custom Rust types) has no representation here and is dropped
//! during harvesting.
use rhai::{Array, Dynamic, Map, FLOAT, INT};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A JSON-representable value produced by (or seeded into) a script
#[derive(Debug, Clone, PartialEq)]
pub enum ExportableValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Sequence(Vec<ExportableValue>),
    Mapping(BTreeMap<String, ExportableValue>),
}

impl ExportableValue {
    /// Convert an engine value, returning `None` when any part of it is not exportable.
    ///
    /// Containers are all-or-nothing: an array holding a closure is dropped as a whole.
    pub fn from_dynamic(value: &Dynamic) -> Option<Self> {
        let value = value.flatten_clone();

        if value.is_unit() {
            return Some(Self::Null);
        }
        if let Ok(b) = value.as_bool() {
            return Some(Self::Bool(b));
        }
        if let Ok(i) = value.as_int() {
            return Some(Self::Int(i));
        }
        if let Ok(f) = value.as_float() {
            // JSON has no NaN/inf
            return f.is_finite().then_some(Self::Float(f));
        }
        if let Ok(c) = value.as_char() {
            return Some(Self::Text(c.to_string()));
        }
        if value.is_string() {
            return value.into_string().ok().map(Self::Text);
        }
        if value.is_array() {
            let items = value.into_array().ok()?;
            return items
                .iter()
                .map(Self::from_dynamic)
                .collect::<Option<Vec<_>>>()
                .map(Self::Sequence);
        }
        if value.is_map() {
            let map = value.try_cast::<Map>()?;
            return map
                .iter()
                .map(|(k, v)| Self::from_dynamic(v).map(|v| (k.to_string(), v)))
                .collect::<Option<BTreeMap<_, _>>>()
                .map(Self::Mapping);
        }

        None
    }

    /// Convert into an engine value for seeding a namespace
    pub fn to_dynamic(&self) -> Dynamic {
        match self {
            Self::Null => Dynamic::UNIT,
            Self::Bool(b) => Dynamic::from_bool(*b),
            Self::Int(i) => Dynamic::from_int(*i as INT),
            Self::Float(f) => Dynamic::from_float(*f as FLOAT),
            Self::Text(s) => Dynamic::from(s.clone()),
            Self::Sequence(items) => {
                let array: Array = items.iter().map(Self::to_dynamic).collect();
                Dynamic::from_array(array)
            }
            Self::Mapping(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k.as_str().into(), v.to_dynamic());
                }
                Dynamic::from_map(map)
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
            Self::Sequence(_) => "array",
            Self::Mapping(_) => "object",
        }
    }
}

impl From<serde_json::Value> for ExportableValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                // u64 beyond i64::MAX and real floats
                None => Self::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<ExportableValue> for serde_json::Value {
    fn from(value: ExportableValue) -> Self {
        use serde_json::Value;

        match value {
            ExportableValue::Null => Value::Null,
            ExportableValue::Bool(b) => Value::Bool(b),
            ExportableValue::Int(i) => Value::from(i),
            ExportableValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ExportableValue::Text(s) => Value::String(s),
            ExportableValue::Sequence(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            ExportableValue::Mapping(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ExportableValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for ExportableValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ExportableValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Serialize for ExportableValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
