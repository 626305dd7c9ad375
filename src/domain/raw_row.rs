//! Loosely-typed row representation shared by every store adapter.
//!
//! Adapters produce [`RawRow`]s; the record mapper decodes them field by field.
//! An absent key and a [`RawValue::Null`] both mean "not set".

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

pub type RawRow = BTreeMap<String, RawValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Object(BTreeMap<String, RawValue>),
}

impl RawValue {
    /// Short variant name used in decode error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "bool",
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Text(_) => "text",
            RawValue::Date(_) => "date",
            RawValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a JSON document into a raw value.
    ///
    /// Arrays have no column counterpart and are carried as their JSON text.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                None => n.as_f64().map_or(RawValue::Null, RawValue::Float),
            },
            Value::String(s) => RawValue::Text(s),
            Value::Object(map) => RawValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, RawValue::from_json(v)))
                    .collect(),
            ),
            array @ Value::Array(_) => RawValue::Text(array.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RawValue::Null => Value::Null,
            RawValue::Bool(b) => Value::Bool(*b),
            RawValue::Integer(i) => Value::Number(Number::from(*i)),
            RawValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            RawValue::Text(s) => Value::String(s.clone()),
            RawValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            RawValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(value: NaiveDate) -> Self {
        RawValue::Date(value)
    }
}

/// Converts one JSON object (a PostgREST result element) into a raw row.
pub fn row_from_json(map: Map<String, Value>) -> RawRow {
    map.into_iter()
        .map(|(k, v)| (k, RawValue::from_json(v)))
        .collect()
}

pub fn row_to_json(row: &RawRow) -> Value {
    Value::Object(
        row.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<Map<String, Value>>(),
    )
}
