//! Response envelopes of the catalog API.

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::PageMeta;

/// Longest raw body excerpt kept in an error message.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
pub(super) struct ListResponse {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub meta: Option<ListMeta>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListMeta {
    #[serde(default)]
    pub pagination: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SingleResponse {
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Lift an `{ id, attributes: {…} }` entry into a flat object.
///
/// Entries that are already flat are returned unchanged.
pub(super) fn flatten_entry(entry: Value) -> Value {
    let Value::Object(mut map) = entry else {
        return entry;
    };
    let Some(Value::Object(attributes)) = map.remove("attributes") else {
        return Value::Object(map);
    };
    let mut flat = attributes;
    for (key, value) in map {
        flat.insert(key, value);
    }
    Value::Object(flat)
}

/// Human-readable message from an error body.
///
/// Uses `error.name: error.message` when the body is the catalog's error
/// envelope, otherwise a truncated excerpt of the raw body.
pub(super) fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let ErrorBody { name, message } = envelope.error;
        return match (name, message) {
            (Some(name), Some(message)) => format!("{name}: {message}"),
            (None, Some(message)) => message,
            (Some(name), None) => name,
            (None, None) => "unknown error".to_owned(),
        };
    }
    body.chars().take(MAX_ERROR_BODY).collect()
}
