//! Configuration types for the JSON-RPC client

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use turul_json_rpc::PayloadSerializer;
use turul_json_rpc::payload::{CAMEL_CASE, SNAKE_CASE, VERBATIM};

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    /// Timeout configurations
    pub timeouts: TimeoutConfig,

    /// Connection configurations
    pub connection: ConnectionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Key naming convention for params, results and error data
    #[serde(default)]
    pub payload_naming: PayloadNaming,
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout
    #[serde(with = "duration_serde")]
    pub connect: Duration,

    /// Timeout for a whole exchange, from send to captured body
    #[serde(with = "duration_serde")]
    pub request: Duration,
}

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// User agent string
    pub user_agent: Option<String>,

    /// Custom headers to include in requests
    pub headers: Option<HashMap<String, String>>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Whether to log request bodies
    pub log_requests: bool,

    /// Whether to log response bodies
    pub log_responses: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayloadNaming {
    #[default]
    SnakeCase,
    CamelCase,
    Verbatim,
}

impl PayloadNaming {
    pub fn serializer(self) -> &'static dyn PayloadSerializer {
        match self {
            PayloadNaming::SnakeCase => &SNAKE_CASE,
            PayloadNaming::CamelCase => &CAMEL_CASE,
            PayloadNaming::Verbatim => &VERBATIM,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user_agent: Some(format!("turul-json-rpc-client/{}", env!("CARGO_PKG_VERSION"))),
            headers: None,
        }
    }
}

// Helper module for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
