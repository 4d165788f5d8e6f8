use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::Value;

/// Errors produced while converting host JSON into [`Value`].
#[derive(Debug, Error)]
pub enum JsonError {
    #[error("value json parse error: {0}")]
    ValueParse(String),
    #[error("unsupported value shorthand: {0}")]
    Unsupported(String),
}

/// Normalize shorthand `Value` JSON into the canonical `{ "type": ..., "data": ... }`
/// representation understood by the serde derives on [`Value`]. Accepted shorthands:
/// numbers (`1.0`), three-element arrays (`[0, 1, 0]`), strings (references) and
/// transform objects (`{ "tr": [...], "ori": [...], "sc": [...] }`, missing parts default).
pub fn normalize_value_json(value: JsonValue) -> Result<JsonValue, JsonError> {
    match value {
        JsonValue::Number(n) => Ok(json!({ "type": "float", "data": n })),
        JsonValue::String(s) => Ok(json!({ "type": "reference", "data": s })),
        JsonValue::Array(arr) if arr.len() == 3 && arr.iter().all(|x| x.is_number()) => {
            Ok(json!({ "type": "vec3", "data": arr }))
        }
        JsonValue::Object(obj) => {
            if obj.contains_key("type") && obj.contains_key("data") {
                return Ok(JsonValue::Object(obj));
            }
            if obj.contains_key("tr") || obj.contains_key("ori") || obj.contains_key("sc") {
                let tr = obj.get("tr").cloned().unwrap_or_else(|| json!([0.0, 0.0, 0.0]));
                let ori = obj
                    .get("ori")
                    .cloned()
                    .unwrap_or_else(|| json!([0.0, 0.0, 0.0, 1.0]));
                let sc = obj.get("sc").cloned().unwrap_or_else(|| json!([1.0, 1.0, 1.0]));
                return Ok(json!({
                    "type": "transform",
                    "data": { "tr": tr, "ori": ori, "sc": sc }
                }));
            }
            Err(JsonError::Unsupported(JsonValue::Object(obj).to_string()))
        }
        other => Err(JsonError::Unsupported(other.to_string())),
    }
}

/// Parse shorthand or canonical JSON into a [`Value`].
pub fn parse_value(value: JsonValue) -> Result<Value, JsonError> {
    let normalized = normalize_value_json(value)?;
    serde_json::from_value(normalized).map_err(|e| JsonError::ValueParse(e.to_string()))
}
