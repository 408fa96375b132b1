//! Conversion between [`Value`] and `serde_json::Value`.
//!
//! Used by file-backed storage to persist rows as JSON. The `Min`/`Max`
//! sentinels have no JSON form: they are only legal in scan bounds and must
//! never reach persistence.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Converts a value to its JSON form.
///
/// # Errors
///
/// Returns [`CodecError::UnrepresentableSentinel`] if the value contains a
/// `Min` or `Max` sentinel anywhere.
pub fn value_to_json(value: &Value) -> CodecResult<serde_json::Value> {
    match value {
        Value::Min | Value::Max => Err(CodecError::UnrepresentableSentinel),
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .ok_or(CodecError::UnrepresentableNumber),
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Array(items) => Ok(serde_json::Value::Array(
            items.iter().map(value_to_json).collect::<CodecResult<_>>()?,
        )),
        Value::Object(pairs) => {
            let mut map = serde_json::Map::with_capacity(pairs.len());
            for (key, val) in pairs {
                map.insert(key.clone(), value_to_json(val)?);
            }
            Ok(serde_json::Value::Object(map))
        }
    }
}

/// Converts a JSON value to a tuple value.
///
/// JSON integers are widened to f64; object keys are re-sorted into the
/// canonical entry order.
///
/// # Errors
///
/// Returns [`CodecError::UnrepresentableNumber`] for a JSON number outside
/// the f64 domain.
pub fn value_from_json(json: &serde_json::Value) -> CodecResult<Value> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .ok_or(CodecError::UnrepresentableNumber),
        serde_json::Value::String(s) => Ok(Value::String(s.clone())),
        serde_json::Value::Array(items) => Ok(Value::Array(
            items.iter().map(value_from_json).collect::<CodecResult<_>>()?,
        )),
        serde_json::Value::Object(map) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (key, val) in map {
                pairs.push((key.clone(), value_from_json(val)?));
            }
            Ok(Value::object(pairs))
        }
    }
}
