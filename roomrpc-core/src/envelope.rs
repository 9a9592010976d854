//! # Wire Envelopes
//!
//! The JSON structures exchanged with the remote side.
//!
//! * [`RequestEnvelope`]: built once per invocation, serialized and handed to the transport.
//! * [`ResponseEnvelope`]: parsed from the transport's response body when one is present.
//! * [`ErrorInfo`]: the `{ message, type }` record used for transport failures and for
//!   well-formed remote errors.
use serde::{Deserialize, Serialize, de::Error as _};
use serde_json::Value;

/// A single RPC request as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Unique per call. Produced by an [`crate::IdGenerator`].
    pub id: String,
    /// The fully qualified method name.
    pub name: String,
    /// Whatever the caller passed to the method.
    pub params: Value,
}

impl RequestEnvelope {
    pub fn new(id: impl Into<String>, name: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            params,
        }
    }

    /// Serializes the envelope into the JSON text sent as the request body.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The body of a response.
///
/// Both fields are optional on the wire. When `error` is truthy it wins over `result`,
/// even if both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ResponseEnvelope {
    /// Parses a response body.
    ///
    /// Anything that is not a JSON object is rejected. The parser error is returned so the
    /// caller can decide what to surface; the binder discards it.
    pub fn decode(body: &str) -> Result<Self, serde_json::Error> {
        // Derived struct impls also accept sequences, so check the shape first.
        match serde_json::from_str::<Value>(body)? {
            value @ Value::Object(_) => serde_json::from_value(value),
            _ => Err(serde_json::Error::custom("response body is not a JSON object")),
        }
    }

    /// Splits the envelope into the call outcome.
    ///
    /// * `Err(error)` when `error` is truthy.
    /// * `Ok(result)` otherwise, with a missing `result` read as `null`.
    pub fn into_outcome(self) -> Result<Value, Value> {
        match self.error {
            Some(error) if is_truthy(&error) => Err(error),
            _ => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A plain `{ message, type }` failure record.
///
/// This is the only error shape that crosses a process boundary intact, so transports use
/// it for every failure they raise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ErrorInfo {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
        }
    }

    /// A failure tagged as originating in the transport layer.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(message, crate::TRANSPORT_ERROR_TYPE)
    }

    pub fn is_transport(&self) -> bool {
        self.kind == crate::TRANSPORT_ERROR_TYPE
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""` are falsy, everything else is truthy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_wire_shape() {
        let request = RequestEnvelope::new("abc", "users.get", json!({ "id": 7 }));
        let encoded: Value = serde_json::from_str(&request.encode().unwrap()).unwrap();

        assert_eq!(
            encoded,
            json!({ "id": "abc", "name": "users.get", "params": { "id": 7 } })
        );
    }

    #[test]
    fn test_error_takes_precedence_over_result() {
        let envelope =
            ResponseEnvelope::decode(r#"{"result": 1, "error": {"message": "no", "type": "E"}}"#)
                .unwrap();

        assert_eq!(
            envelope.into_outcome(),
            Err(json!({ "message": "no", "type": "E" }))
        );
    }

    #[test]
    fn test_falsy_error_is_ignored() {
        for error in [json!(null), json!(false), json!(0), json!("")] {
            let envelope = ResponseEnvelope {
                result: Some(json!("ok")),
                error: Some(error),
            };
            assert_eq!(envelope.into_outcome(), Ok(json!("ok")));
        }
    }

    #[test]
    fn test_missing_result_reads_as_null() {
        let envelope = ResponseEnvelope::decode("{}").unwrap();
        assert_eq!(envelope.into_outcome(), Ok(Value::Null));
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        assert!(ResponseEnvelope::decode("not json").is_err());
        assert!(ResponseEnvelope::decode("[1, 2]").is_err());
        assert!(ResponseEnvelope::decode("42").is_err());
    }

    #[test]
    fn test_error_info_wire_shape() {
        let info = ErrorInfo::transport("Invalid request");

        let value = serde_json::to_value(&info).unwrap();

        assert!(info.is_transport());
        assert_eq!(
            value,
            json!({ "message": "Invalid request", "type": "TransportError" })
        );
        assert_eq!(serde_json::from_value::<ErrorInfo>(value).unwrap(), info);
    }
}
