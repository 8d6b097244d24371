use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::context::{CallContext, CallState};
use crate::envelope::EnvelopeError;
use crate::payload::PayloadError;
use crate::types::RequestId;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Unhandled failure inside an application handler (-32000)
    ServerError,
    /// The hosting layer failed before reaching an application handler (-32001)
    InternalServerError,
    Custom(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => crate::error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => crate::error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => crate::error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => crate::error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => crate::error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError => crate::error_codes::SERVER_ERROR,
            JsonRpcErrorCode::InternalServerError => crate::error_codes::INTERNAL_SERVER_ERROR,
            JsonRpcErrorCode::Custom(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError => "Server error",
            JsonRpcErrorCode::InternalServerError => "Internal server error",
            JsonRpcErrorCode::Custom(_) => "Application error",
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            crate::error_codes::PARSE_ERROR => JsonRpcErrorCode::ParseError,
            crate::error_codes::INVALID_REQUEST => JsonRpcErrorCode::InvalidRequest,
            crate::error_codes::METHOD_NOT_FOUND => JsonRpcErrorCode::MethodNotFound,
            crate::error_codes::INVALID_PARAMS => JsonRpcErrorCode::InvalidParams,
            crate::error_codes::INTERNAL_ERROR => JsonRpcErrorCode::InternalError,
            crate::error_codes::SERVER_ERROR => JsonRpcErrorCode::ServerError,
            crate::error_codes::INTERNAL_SERVER_ERROR => JsonRpcErrorCode::InternalServerError,
            other => JsonRpcErrorCode::Custom(other),
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            None,
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            Some(message.to_string()),
            None,
        )
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, None)
    }

    pub fn server_error(message: &str, data: Option<Value>) -> Self {
        Self::new(
            JsonRpcErrorCode::ServerError,
            Some(message.to_string()),
            data,
        )
    }

    pub fn internal_server_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalServerError, message, None)
    }

    pub fn kind(&self) -> JsonRpcErrorCode {
        JsonRpcErrorCode::from_code(self.code)
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.code, self.message)
    }
}

/// A violated correlation invariant detected by a [`CallContext`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolViolation {
    #[error("response body did not contain a JSON-RPC message")]
    UnparsableBody,

    #[error("expected jsonrpc version \"2.0\", got \"{actual}\"")]
    VersionMismatch { actual: String },

    #[error("response id {actual} does not match request id {expected}")]
    IdMismatch { expected: RequestId, actual: RequestId },

    #[error("response id {0} does not belong to any request in the batch")]
    UnknownResponseId(RequestId),

    #[error("response id {0} appears more than once in the batch response")]
    DuplicateResponseId(RequestId),

    #[error("received a batch response for a batch made only of notifications")]
    UnexpectedBatchResponse,

    #[error("received a response to a notification")]
    UnexpectedResponse,

    #[error("server returned an empty batch array")]
    EmptyBatchViolation,

    #[error("expected {expected} responses in batch, got {actual}")]
    BatchCountMismatch { expected: usize, actual: usize },

    #[error("response shape ({actual}) does not match the outgoing call shape ({expected})")]
    ResponseShapeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors surfaced by a [`CallContext`] and the result accessors.
///
/// Fatal variants carry a snapshot of the context so that the error renders
/// everything gathered up to the failing step.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Invalid request url '{0}': must not start with '/'")]
    InvalidUrl(String),

    #[error("Invalid call context transition from {from} to {to}")]
    InvalidTransition { from: CallState, to: CallState },

    #[error("Call context already failed and accepts no further steps: {first_error}")]
    ContextFailed { first_error: String },

    #[error("Call context already holds a call of the other shape (single vs batch)")]
    ConflictingCallShape,

    #[error("Call context already holds a response of the other shape (single vs batch)")]
    ConflictingResponseShape,

    #[error("Batch call must contain at least one request or notification")]
    EmptyBatch,

    #[error("Unexpected HTTP status {status}\n{context}")]
    UnexpectedHttpStatus {
        status: u16,
        context: Box<CallContext>,
    },

    #[error("Malformed JSON-RPC body: {source}\n{context}")]
    Framing {
        #[source]
        source: EnvelopeError,
        context: Box<CallContext>,
    },

    #[error("JSON-RPC protocol violation: {violation}\n{context}")]
    Protocol {
        violation: ProtocolViolation,
        context: Box<CallContext>,
    },

    #[error("No response on record for id {}", .id.as_ref().map(ToString::to_string).unwrap_or_else(|| "<single>".to_string()))]
    NoResponse { id: Option<RequestId> },

    #[error("Remote {error}\n{context}")]
    RemoteError {
        error: JsonRpcErrorObject,
        context: Box<CallContext>,
    },

    #[error("Payload conversion failed: {0}")]
    Payload(#[from] PayloadError),

    #[error("Call context is not complete (state: {0})")]
    IncompleteContext(CallState),

    #[error("Call context holds a {actual} call, accessor expects {expected}")]
    WrongContextShape {
        expected: &'static str,
        actual: &'static str,
    },
}

impl CallError {
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    pub fn violation(&self) -> Option<&ProtocolViolation> {
        match self {
            Self::Protocol { violation, .. } => Some(violation),
            _ => None,
        }
    }

    /// The remote error object if the server answered with an error response
    pub fn remote_error(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            Self::RemoteError { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&CallContext> {
        match self {
            Self::UnexpectedHttpStatus { context, .. }
            | Self::Framing { context, .. }
            | Self::Protocol { context, .. }
            | Self::RemoteError { context, .. } => Some(context),
            _ => None,
        }
    }
}
