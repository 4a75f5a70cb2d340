//! Wire codec: a notification is stored as one flat JSON object carrying its `type`
//! tag next to every populated field.
//!
//! Decoding is tolerant of fields it does not know, so a feed written by a newer
//! build stays readable as long as the variant itself is known.

use serde_json::{Map, Value};

use crate::models::{Notification, NotificationKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("unknown notification variant: {0}")]
    UnknownVariant(String),

    #[error("malformed notification payload: {0}")]
    MalformedPayload(String),
}

const TYPE_FIELD: &str = "type";

pub fn encode(notification: &Notification) -> Result<String, CodecError> {
    // serde_json writes NaN/inf as null, which would never decode again.
    if !notification.time().is_finite() {
        return Err(CodecError::MalformedPayload(format!(
            "non-finite time {}",
            notification.time()
        )));
    }
    serde_json::to_string(notification).map_err(|e| CodecError::MalformedPayload(e.to_string()))
}

pub fn decode(payload: &str) -> Result<Notification, CodecError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
    match value {
        Value::Object(fields) => from_fields(fields),
        other => Err(CodecError::MalformedPayload(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Raw construction: resolves the variant from `type` and assigns every other field as
/// given. Nothing is derived or defaulted beyond absent optional fields.
pub fn from_fields(fields: Map<String, Value>) -> Result<Notification, CodecError> {
    let tag = match fields.get(TYPE_FIELD) {
        Some(Value::String(tag)) => tag.clone(),
        Some(other) => {
            return Err(CodecError::MalformedPayload(format!(
                "`type` must be a string, got {}",
                json_kind(other)
            )));
        }
        None => return Err(CodecError::MalformedPayload("missing `type` field".into())),
    };
    let kind: NotificationKind = tag.parse()?;

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| CodecError::MalformedPayload(format!("{} payload: {}", kind, e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
