//! # JSON-RPC Client Prelude
//!
//! This module provides convenient re-exports of the most commonly used types
//! and traits from the JSON-RPC client library.
//!
//! ```rust
//! use turul_json_rpc_client::prelude::*;
//! ```

// Core client types
pub use crate::client::{BatchBuilder, JsonRpcClient, JsonRpcClientBuilder};
pub use crate::config::{ClientConfig, PayloadNaming, TimeoutConfig};
pub use crate::error::{ClientError, ClientResult, TransportError};

// Transport types
pub use crate::transport::{HttpTransport, Transport, TransportResponse};

// Re-export protocol types for convenience
pub use turul_json_rpc::prelude::*;

// Standard library types commonly used with the client
pub use std::time::Duration;
