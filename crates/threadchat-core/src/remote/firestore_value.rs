//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore REST wraps every value in a single-key object naming its type,
//! e.g. `{"stringValue": "hi"}` or `{"integerValue": "42"}` (64-bit integers
//! travel as strings).

use serde_json::{json, Map, Value};

use super::RemoteError;

/// Encode a JSON object as a Firestore `fields` map
pub fn encode_fields(document: &Value) -> Result<Value, RemoteError> {
    let object = document
        .as_object()
        .ok_or_else(|| RemoteError::Decode("documents must be JSON objects".to_string()))?;
    Ok(Value::Object(encode_map(object)))
}

fn encode_map(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                // Beyond i64 range; Firestore integers are signed 64-bit
                json!({ "doubleValue": u as f64 })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(object) => json!({ "mapValue": { "fields": encode_map(object) } }),
    }
}

/// Decode a Firestore `fields` map into a plain JSON object
pub fn decode_fields(fields: &Value) -> Result<Value, RemoteError> {
    match fields {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(object) => Ok(Value::Object(decode_map(object)?)),
        other => Err(RemoteError::Decode(format!("expected fields object, got {}", other))),
    }
}

fn decode_map(object: &Map<String, Value>) -> Result<Map<String, Value>, RemoteError> {
    object
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

pub fn decode_value(value: &Value) -> Result<Value, RemoteError> {
    let object = value
        .as_object()
        .ok_or_else(|| RemoteError::Decode(format!("expected typed value, got {}", value)))?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| RemoteError::Decode("empty typed value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(inner.clone()),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| RemoteError::Decode(format!("bad integerValue {}", inner)))
        }
        "doubleValue" => Ok(inner.clone()),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => decode_fields(inner.get("fields").unwrap_or(&Value::Null)),
        "geoPointValue" => Ok(inner.clone()),
        other => Err(RemoteError::Decode(format!("unknown value type {}", other))),
    }
}
