//! The uniform response wrapper returned by every tool call.
//!
//! A success envelope is the `status` tag followed by the operation's payload
//! fields; an error envelope is the tag plus an `error` message and, when the
//! failure came from the provider, its status code.

use crate::errors::InvalidParamsError;
use crate::google::RemoteError;
use anyhow::{Result, anyhow};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Envelope {
    Success(Map<String, Value>),
    Error(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    /// Provider status such as `NOT_FOUND` or `PERMISSION_DENIED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Offending argument, for argument errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Envelope {
    /// Wrap a typed payload. The payload must serialize to a JSON object and
    /// must not carry its own `status` field.
    pub fn success<T: Serialize>(payload: &T) -> Result<Self> {
        match serde_json::to_value(payload)? {
            Value::Object(mut fields) => {
                fields.remove("status");
                Ok(Envelope::Success(fields))
            }
            other => Err(anyhow!(
                "tool payload must be a JSON object, got {}",
                json_kind(&other)
            )),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error(ErrorBody {
            error: message.into(),
            code: None,
            http_status: None,
            path: None,
        })
    }

    /// Build an error envelope from any failure, keeping provider status codes
    /// and argument paths when the error carries them.
    pub fn from_error(error: &anyhow::Error) -> Self {
        if let Some(remote) = error.downcast_ref::<RemoteError>() {
            return Envelope::Error(ErrorBody {
                error: remote.to_string(),
                code: remote.status().map(str::to_string),
                http_status: remote.http_status(),
                path: None,
            });
        }

        if let Some(invalid) = error.downcast_ref::<InvalidParamsError>() {
            return Envelope::Error(ErrorBody {
                error: invalid.message().to_string(),
                code: Some("INVALID_ARGUMENT".to_string()),
                http_status: None,
                path: invalid.path().map(str::to_string),
            });
        }

        Envelope::error(format!("{error:#}"))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "status": "error", "error": format!("failed to encode envelope: {e}") })
        })
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!("{{\"status\":\"error\",\"error\":\"failed to encode envelope: {e}\"}}")
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Payload {
        data: Vec<Vec<Value>>,
    }

    #[test]
    fn success_envelope_puts_status_first_and_keeps_payload() {
        let envelope = Envelope::success(&Payload { data: Vec::new() }).unwrap();
        let value = envelope.to_value();
        assert_eq!(value, json!({ "status": "success", "data": [] }));
        let text = envelope.to_pretty_json();
        assert!(text.trim_start().starts_with("{\n  \"status\": \"success\""));
    }

    #[test]
    fn error_envelope_has_no_payload_fields() {
        let envelope = Envelope::error("boom");
        assert_eq!(envelope.to_value(), json!({ "status": "error", "error": "boom" }));
        assert!(!envelope.is_success());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = Envelope::success(&vec![1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn remote_error_keeps_provider_status() {
        let err: anyhow::Error =
            RemoteError::from_provider(404, Some("NOT_FOUND".into()), "Requested entity was not found.".into())
                .into();
        let value = Envelope::from_error(&err).to_value();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "Requested entity was not found.");
        assert_eq!(value["code"], "NOT_FOUND");
        assert_eq!(value["http_status"], 404);
    }
}
