//! # JSON-RPC Prelude
//!
//! This module provides convenient re-exports of the most commonly used types
//! from the JSON-RPC engine.
//!
//! ```rust
//! use turul_json_rpc::prelude::*;
//! ```

// Core JSON-RPC types
pub use crate::error::{CallError, JsonRpcErrorCode, JsonRpcErrorObject, ProtocolViolation};
pub use crate::notification::JsonRpcNotification;
pub use crate::request::{JsonRpcCall, JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcErrorResponse, JsonRpcMessage, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

// Correlation
pub use crate::accessors::{BatchResult, SingleResult, TypedRpcError};
pub use crate::context::{CallContext, CallState, HttpResponseInfo};
pub use crate::envelope::Envelope;
pub use crate::id::generate_id;
pub use crate::payload::{CAMEL_CASE, PayloadSerializer, SNAKE_CASE, VERBATIM};

#[cfg(feature = "async")]
pub use crate::r#async::{JsonRpcDispatcher, JsonRpcHandler, ToJsonRpcError};

// Standard error codes
pub use crate::error_codes::*;
