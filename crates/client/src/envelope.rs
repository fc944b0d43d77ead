//! Response envelope decoding and classification.
//!
//! The API wraps payloads as `{ "ok": true, "data": ... }` and failures as
//! `{ "ok": false, "error": ... }`, where `error` is a message string or an
//! object with `message`, `code` and `details`. A body that is not JSON
//! decodes as an empty object.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::transport::RawResponse;

/// Decoded success payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Contents of `data`; `None` when the envelope had no `data` field.
    pub data: Option<Value>,
}

impl Payload {
    /// The payload, with a missing `data` field read as `null`.
    pub fn into_value(self) -> Value {
        self.data.unwrap_or(Value::Null)
    }
}

/// Decode a body as JSON, falling back to `{}`.
pub fn decode_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Classify a raw response as a success payload or an application error.
pub fn classify(method: &str, url: &str, response: &RawResponse) -> Result<Payload, ApiError> {
    let json = decode_body(&response.body);
    let explicit_failure = json.get("ok").and_then(Value::as_bool) == Some(false);

    if !response.is_success() || explicit_failure {
        let error = json.get("error");
        let (message, code, details) = match error {
            Some(Value::String(msg)) => (Some(msg.clone()), None, None),
            Some(Value::Object(obj)) => (
                obj.get("message").and_then(Value::as_str).map(str::to_string),
                obj.get("code").and_then(Value::as_str).map(str::to_string),
                obj.get("details").filter(|d| !d.is_null()).cloned(),
            ),
            _ => (None, None, None),
        };
        return Err(ApiError::application(method, url, response.status, code, message, details, json));
    }

    let data = match json {
        Value::Object(mut obj) => obj.remove("data"),
        _ => None,
    };
    Ok(Payload { data })
}
