//! # JSON-RPC 2.0 Protocol Engine
//!
//! Transport-agnostic building blocks for both ends of a JSON-RPC 2.0 exchange.
//!
//! ## Features
//! - Message model with type-discriminated request ids
//! - Envelope codec that decides single vs batch and request vs notification once, at the parse boundary
//! - Pluggable payload naming conventions (snake_case, camelCase, verbatim)
//! - [`CallContext`]: client-side correlation state machine with step-by-step validation
//! - [`SingleResult`] / [`BatchResult`] accessors over a completed exchange
//! - Method dispatcher for the server side with `async` feature

pub mod accessors;
pub mod context;
pub mod envelope;
pub mod error;
pub mod id;
pub mod notification;
pub mod payload;
pub mod prelude;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "async")]
pub mod r#async;

// Re-export main types
pub use accessors::{BatchResult, SingleResult, TypedRpcError};
pub use context::{CallContext, CallState, HttpResponseInfo};
pub use envelope::{Envelope, EnvelopeError};
pub use error::{CallError, JsonRpcErrorCode, JsonRpcErrorObject, ProtocolViolation};
pub use id::{IdGenerator, generate_id};
pub use notification::JsonRpcNotification;
pub use payload::{PayloadError, PayloadSerializer};
pub use request::{JsonRpcCall, JsonRpcRequest, RequestParams};
pub use response::{JsonRpcErrorResponse, JsonRpcMessage, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use r#async::{JsonRpcDispatcher, JsonRpcHandler, ToJsonRpcError};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Unhandled failure inside a method handler
    pub const SERVER_ERROR: i64 = -32000;
    /// Failure in the hosting layer before a handler ran
    pub const INTERNAL_SERVER_ERROR: i64 = -32001;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
