//! Conversion between JSON values and SQLite storage values.
//!
//! Scalars map onto their natural storage class; booleans become 0/1, and
//! nested objects and arrays are stored as compact JSON text.

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value;

use crate::Result;

pub fn encode_value(value: &Value) -> Result<SqlValue> {
  Ok(match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    Value::Array(_) | Value::Object(_) => SqlValue::Text(serde_json::to_string(value)?),
  })
}

pub fn decode_value(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::from(i),
    ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
    ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
      Value::String(String::from_utf8_lossy(bytes).into_owned())
    }
  }
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }
