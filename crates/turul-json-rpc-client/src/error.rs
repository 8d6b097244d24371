//! Error types for JSON-RPC client operations

use std::time::Duration;

use thiserror::Error;
use turul_json_rpc::{
    CallContext, CallError, JsonRpcErrorObject, PayloadError, ProtocolViolation,
};

/// Result type for JSON-RPC client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Error type for JSON-RPC client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Correlation, framing or remote errors raised while processing an exchange
    #[error(transparent)]
    Call(#[from] CallError),

    /// Transport-level errors; raised during an exchange they carry the
    /// context gathered before the failure
    #[error("Transport error: {source}{}", render_context(.context))]
    Transport {
        #[source]
        source: TransportError,
        context: Option<Box<CallContext>>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Params could not be converted to the wire convention
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),
}

/// Transport-specific errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<TransportError> for ClientError {
    fn from(source: TransportError) -> Self {
        Self::Transport {
            source,
            context: None,
        }
    }
}

fn render_context(context: &Option<Box<CallContext>>) -> String {
    context
        .as_ref()
        .map(|ctx| format!("\n{}", ctx))
        .unwrap_or_default()
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Http(format!("Timed out: {}", err))
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

impl ClientError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if the error is a JSON-RPC protocol violation by the server
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Call(err) if err.is_protocol_violation())
    }

    /// Wrap a transport error raised mid-exchange with a snapshot of the context
    pub fn transport(source: TransportError, context: &CallContext) -> Self {
        Self::Transport {
            source,
            context: Some(Box::new(context.clone())),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                source: TransportError::Timeout(_),
                ..
            }
        )
    }

    pub fn violation(&self) -> Option<&ProtocolViolation> {
        match self {
            Self::Call(err) => err.violation(),
            _ => None,
        }
    }

    /// The error object if the server answered with an error response
    pub fn remote_error(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            Self::Call(err) => err.remote_error(),
            _ => None,
        }
    }

    /// Get the error code if this is a remote error
    pub fn error_code(&self) -> Option<i64> {
        self.remote_error().map(|error| error.code)
    }

    /// Snapshot of the exchange up to the failing step, when one was captured
    pub fn context(&self) -> Option<&CallContext> {
        match self {
            Self::Call(err) => err.context(),
            Self::Transport { context, .. } => context.as_deref(),
            _ => None,
        }
    }
}
