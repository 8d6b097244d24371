//! Envelope codec
//!
//! Converts between wire JSON and the message model. The shape of every
//! message is decided here, once, from a fixed set of markers:
//!
//! - root token: object ⇒ single, array ⇒ batch
//! - `id` key present ⇒ request, absent ⇒ notification
//! - `result` key ⇒ response, `error` key ⇒ error response (never both)
//!
//! `params`, `result` and `error.data` are carried as opaque JSON and never
//! inspected beyond their top-level shape.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::JsonRpcErrorObject;
use crate::notification::JsonRpcNotification;
use crate::request::{JsonRpcCall, JsonRpcRequest, RequestParams, shape_name};
use crate::response::{JsonRpcErrorResponse, JsonRpcMessage, JsonRpcResponse};
use crate::types::RequestId;

/// Framing errors raised while decoding or encoding an envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Root of a JSON-RPC body must be an object or an array, got {0}")]
    InvalidRoot(&'static str),

    #[error("Batch must not be empty")]
    EmptyBatch,

    #[error("Batch member {index} must be an object, got {shape}")]
    InvalidMember { index: usize, shape: &'static str },

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Invalid id shape: {0}")]
    InvalidIdShape(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(&'static str),

    #[error("Params must be an object or an array, got {0}")]
    UnsupportedParamsShape(&'static str),

    #[error("Unsupported JSON-RPC version \"{0}\"")]
    VersionMismatch(String),
}

impl EnvelopeError {
    /// The JSON-RPC error a server answers with for this framing failure
    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            EnvelopeError::Json(_) => JsonRpcErrorObject::parse_error(None),
            other => JsonRpcErrorObject::invalid_request(Some(Value::String(other.to_string()))),
        }
    }
}

/// A single message or an ordered batch of messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Single(T),
    Batch(Vec<T>),
}

impl<T> Envelope<T> {
    pub fn is_batch(&self) -> bool {
        matches!(self, Envelope::Batch(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Envelope::Single(_) => 1,
            Envelope::Batch(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Envelope::Single(_) => "single",
            Envelope::Batch(_) => "batch",
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Envelope::Single(item) => std::slice::from_ref(item).iter(),
            Envelope::Batch(items) => items.iter(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Envelope::Single(item) => vec![item],
            Envelope::Batch(items) => items,
        }
    }
}

/// Serialize an envelope to a request or response body.
///
/// An empty batch is refused: JSON-RPC forbids sending `[]`.
pub fn to_body<T: Serialize>(envelope: &Envelope<T>) -> Result<String, EnvelopeError> {
    if let Envelope::Batch(items) = envelope
        && items.is_empty()
    {
        return Err(EnvelopeError::EmptyBatch);
    }
    Ok(serde_json::to_string(envelope)?)
}

/// Parse a request-side body into calls.
pub fn parse_calls(body: &str) -> Result<Envelope<JsonRpcCall>, EnvelopeError> {
    let value: Value = serde_json::from_str(body)?;
    split_root(value, parse_call)
}

/// Parse a response-side body into responses.
pub fn parse_responses(body: &str) -> Result<Envelope<JsonRpcMessage>, EnvelopeError> {
    let value: Value = serde_json::from_str(body)?;
    split_root(value, parse_response)
}

fn split_root<T>(
    value: Value,
    parse: impl Fn(&Value) -> Result<T, EnvelopeError>,
) -> Result<Envelope<T>, EnvelopeError> {
    match value {
        Value::Object(_) => parse(&value).map(Envelope::Single),
        Value::Array(items) => {
            if items.is_empty() {
                return Err(EnvelopeError::EmptyBatch);
            }
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    if !item.is_object() {
                        return Err(EnvelopeError::InvalidMember {
                            index,
                            shape: shape_name(item),
                        });
                    }
                    parse(item)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Envelope::Batch)
        }
        other => Err(EnvelopeError::InvalidRoot(shape_name(&other))),
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, EnvelopeError> {
    value
        .as_object()
        .ok_or(EnvelopeError::InvalidRoot(shape_name(value)))
}

fn version_of(obj: &Map<String, Value>) -> Result<String, EnvelopeError> {
    match obj.get("jsonrpc") {
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(EnvelopeError::InvalidField {
            field: "jsonrpc",
            expected: "a string",
        }),
        None => Err(EnvelopeError::MissingField("jsonrpc")),
    }
}

/// Parse one call object. Float ids are refused on calls.
pub fn parse_call(value: &Value) -> Result<JsonRpcCall, EnvelopeError> {
    let obj = as_object(value)?;

    let version = version_of(obj)?;
    if version != crate::JSONRPC_VERSION {
        return Err(EnvelopeError::VersionMismatch(version));
    }

    let method = match obj.get("method") {
        Some(Value::String(m)) => m.clone(),
        Some(_) => {
            return Err(EnvelopeError::InvalidField {
                field: "method",
                expected: "a string",
            });
        }
        None => return Err(EnvelopeError::MissingField("method")),
    };

    let params = match obj.get("params") {
        None | Some(Value::Null) => None,
        Some(p) => Some(RequestParams::from_value(p.clone())?),
    };

    match obj.get("id") {
        None => Ok(JsonRpcCall::Notification(JsonRpcNotification::new(
            method, params,
        ))),
        Some(raw_id) => {
            let id = RequestId::from_value(raw_id)?;
            if id.is_float() {
                return Err(EnvelopeError::InvalidIdShape(raw_id.to_string()));
            }
            Ok(JsonRpcCall::Request(JsonRpcRequest::new(id, method, params)))
        }
    }
}

/// Parse one response object.
///
/// The `jsonrpc` value is kept verbatim; checking it is the job of the call
/// context that knows what was sent.
pub fn parse_response(value: &Value) -> Result<JsonRpcMessage, EnvelopeError> {
    let obj = as_object(value)?;

    let version = version_of(obj)?;
    let id = match obj.get("id") {
        Some(raw_id) => RequestId::from_value(raw_id)?,
        None => return Err(EnvelopeError::MissingField("id")),
    };

    match (obj.get("result"), obj.get("error")) {
        (Some(_), Some(_)) => Err(EnvelopeError::MalformedResponse(
            "both 'result' and 'error' are present",
        )),
        (None, None) => Err(EnvelopeError::MalformedResponse(
            "neither 'result' nor 'error' is present",
        )),
        (Some(result), None) => Ok(JsonRpcMessage::Response(JsonRpcResponse {
            version,
            id,
            result: result.clone(),
        })),
        (None, Some(error)) => Ok(JsonRpcMessage::Error(JsonRpcErrorResponse {
            version,
            id,
            error: parse_error_object(error)?,
        })),
    }
}

fn parse_error_object(value: &Value) -> Result<JsonRpcErrorObject, EnvelopeError> {
    let obj = value.as_object().ok_or(EnvelopeError::InvalidField {
        field: "error",
        expected: "an object",
    })?;

    let code = match obj.get("code") {
        Some(code) => code.as_i64().ok_or(EnvelopeError::InvalidField {
            field: "error.code",
            expected: "an integer",
        })?,
        None => return Err(EnvelopeError::MissingField("error.code")),
    };
    let message = match obj.get("message") {
        Some(Value::String(m)) => m.clone(),
        Some(_) => {
            return Err(EnvelopeError::InvalidField {
                field: "error.message",
                expected: "a string",
            });
        }
        None => return Err(EnvelopeError::MissingField("error.message")),
    };

    Ok(JsonRpcErrorObject {
        code,
        message,
        data: obj.get("data").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_request() {
        let calls = parse_calls(r#"{"jsonrpc": "2.0", "method": "test", "id": 1}"#).unwrap();
        let Envelope::Single(call) = calls else {
            panic!("expected single");
        };
        assert!(call.is_request());
        assert_eq!(call.method(), "test");
        assert_eq!(call.request_id(), Some(&RequestId::Number(1)));
    }

    #[test]
    fn test_missing_id_is_notification() {
        let calls = parse_calls(r#"{"jsonrpc": "2.0", "method": "notify"}"#).unwrap();
        assert!(matches!(calls, Envelope::Single(JsonRpcCall::Notification(_))));
    }

    #[test]
    fn test_null_id_is_still_a_request() {
        let calls = parse_calls(r#"{"jsonrpc": "2.0", "method": "m", "id": null}"#).unwrap();
        let Envelope::Single(call) = calls else {
            panic!("expected single");
        };
        assert_eq!(call.request_id(), Some(&RequestId::Null));
    }

    #[test]
    fn test_float_id_rejected_on_calls() {
        let err = parse_calls(r#"{"jsonrpc": "2.0", "method": "m", "id": 1.5}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidIdShape(_)));
    }

    #[test]
    fn test_float_id_accepted_on_responses() {
        let parsed = parse_responses(r#"{"jsonrpc": "2.0", "id": 1.5, "result": true}"#).unwrap();
        let Envelope::Single(msg) = parsed else {
            panic!("expected single");
        };
        assert_eq!(msg.id(), &RequestId::Float(1.5));
    }

    #[test]
    fn test_batch_of_one_stays_a_batch() {
        let parsed = parse_calls(r#"[{"jsonrpc": "2.0", "method": "m", "id": "a"}]"#).unwrap();
        assert!(parsed.is_batch());
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_invalid_roots() {
        assert!(matches!(parse_calls("42"), Err(EnvelopeError::InvalidRoot("number"))));
        assert!(matches!(parse_responses("\"x\""), Err(EnvelopeError::InvalidRoot("string"))));
        assert!(matches!(parse_calls("[]"), Err(EnvelopeError::EmptyBatch)));
        assert!(matches!(parse_responses("[]"), Err(EnvelopeError::EmptyBatch)));
        assert!(matches!(
            parse_calls("[1]"),
            Err(EnvelopeError::InvalidMember { index: 0, .. })
        ));
        assert!(matches!(parse_calls("{"), Err(EnvelopeError::Json(_))));
    }

    #[test]
    fn test_result_and_error_are_exclusive() {
        let both = r#"{"jsonrpc":"2.0","id":1,"result":1,"error":{"code":1,"message":"x"}}"#;
        assert!(matches!(
            parse_responses(both),
            Err(EnvelopeError::MalformedResponse(_))
        ));
        let neither = r#"{"jsonrpc":"2.0","id":1}"#;
        assert!(matches!(
            parse_responses(neither),
            Err(EnvelopeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_null_result_is_a_response() {
        let parsed = parse_responses(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        let Envelope::Single(msg) = parsed else {
            panic!("expected single");
        };
        assert_eq!(msg.result(), Some(&Value::Null));
    }

    #[test]
    fn test_error_object_validation() {
        let bad_code = r#"{"jsonrpc":"2.0","id":1,"error":{"code":"x","message":"m"}}"#;
        assert!(matches!(
            parse_responses(bad_code),
            Err(EnvelopeError::InvalidField { field: "error.code", .. })
        ));
        let no_message = r#"{"jsonrpc":"2.0","id":1,"error":{"code":1}}"#;
        assert!(matches!(
            parse_responses(no_message),
            Err(EnvelopeError::MissingField("error.message"))
        ));
    }

    #[test]
    fn test_response_version_kept_verbatim() {
        let parsed = parse_responses(r#"{"jsonrpc":"1.0","id":1,"result":1}"#).unwrap();
        let Envelope::Single(msg) = parsed else {
            panic!("expected single");
        };
        assert_eq!(msg.version(), "1.0");
    }

    #[test]
    fn test_call_version_checked() {
        let err = parse_calls(r#"{"jsonrpc":"1.0","id":1,"method":"m"}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::VersionMismatch(v) if v == "1.0"));
    }

    #[test]
    fn test_params_shape() {
        let err = parse_calls(r#"{"jsonrpc":"2.0","method":"m","params":3}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::UnsupportedParamsShape("number")));

        let ok = parse_calls(r#"{"jsonrpc":"2.0","method":"m","params":null}"#).unwrap();
        assert!(ok.iter().all(|c| c.params().is_none()));
    }

    #[test]
    fn test_to_body_preserves_order() {
        let calls = Envelope::Batch(vec![
            JsonRpcCall::from(JsonRpcRequest::new_no_params(RequestId::Number(2), "b")),
            JsonRpcCall::from(JsonRpcNotification::new_no_params("n")),
            JsonRpcCall::from(JsonRpcRequest::new_no_params(RequestId::Number(1), "a")),
        ]);
        let body: Value = serde_json::from_str(&to_body(&calls).unwrap()).unwrap();
        assert_eq!(body[0]["method"], "b");
        assert_eq!(body[1]["method"], "n");
        assert!(body[1].get("id").is_none());
        assert_eq!(body[2]["method"], "a");
    }

    #[test]
    fn test_to_body_refuses_empty_batch() {
        let calls: Envelope<JsonRpcCall> = Envelope::Batch(vec![]);
        assert!(matches!(to_body(&calls), Err(EnvelopeError::EmptyBatch)));
    }

    #[test]
    fn test_id_round_trip_through_envelope() {
        for id in [RequestId::from("a"), RequestId::Number(5), RequestId::Null] {
            let response = Envelope::Single(JsonRpcMessage::success(id.clone(), json!(1)));
            let body = to_body(&response).unwrap();
            let Envelope::Single(parsed) = parse_responses(&body).unwrap() else {
                panic!("expected single");
            };
            assert_eq!(parsed.id(), &id);
        }
    }
}
