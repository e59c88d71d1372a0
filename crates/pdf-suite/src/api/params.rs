//! Argument decoding for remote calls.
//!
//! Callers may send list and object arguments either as JSON values or as
//! JSON-encoded strings, and query-string callers send numbers as text. The
//! deserializers here accept both forms.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{PdfSuiteError, Result};

/// Decodes a call's argument object into `T`.
pub fn parse<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| PdfSuiteError::validation(format!("Invalid arguments: {}", e)))
}

fn decode<T: DeserializeOwned>(value: Value) -> std::result::Result<T, serde_json::Error> {
    match value {
        Value::String(text) => match serde_json::from_value(Value::String(text.clone())) {
            Ok(decoded) => Ok(decoded),
            Err(e) => serde_json::from_str(&text).map_err(|_| e),
        },
        other => serde_json::from_value(other),
    }
}

/// Accepts `T` directly or encoded as a JSON string.
pub fn flexible<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    decode(value).map_err(D::Error::custom)
}

/// Like [`flexible`], with `null` read as `None`.
pub fn flexible_opt<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode(value).map(Some).map_err(D::Error::custom),
    }
}

/// Any JSON value; a string argument is parsed as JSON.
pub fn json_value<'de, D>(deserializer: D) -> std::result::Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => serde_json::from_str(&text).map_err(D::Error::custom),
        other => Ok(other),
    }
}

/// Like [`json_value`], with `null` and `""` read as `None`.
pub fn json_value_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => serde_json::from_str(&text)
            .map(Some)
            .map_err(D::Error::custom),
        Some(other) => Ok(Some(other)),
    }
}

/// Returns `name` unless it is absent or blank.
pub fn output_name<'a>(name: Option<&'a str>, default: &'a str) -> &'a str {
    name.filter(|n| !n.trim().is_empty()).unwrap_or(default)
}
