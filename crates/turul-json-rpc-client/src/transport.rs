//! Transport layer for the JSON-RPC client

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;

pub mod http;

pub use http::HttpTransport;

/// Raw HTTP exchange result: status line, headers and body bytes
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Body decoded as UTF-8, invalid sequences replaced
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Carries one request body to the server and brings back the raw response.
///
/// Implementations never interpret the body; status handling and JSON-RPC
/// validation happen in the client's call context.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url`
    async fn send(&self, url: &Url, body: Vec<u8>) -> Result<TransportResponse, TransportError>;

    /// Get transport statistics
    fn statistics(&self) -> TransportStatistics {
        TransportStatistics::default()
    }
}

/// Transport statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct TransportStatistics {
    /// Number of requests sent
    pub requests_sent: u64,
    /// Number of responses received
    pub responses_received: u64,
    /// Number of errors encountered
    pub errors: u64,
    /// Average response time
    pub avg_response_time_ms: f64,
    /// Last error message
    pub last_error: Option<String>,
}

impl TransportStatistics {
    /// Fold one response time into the running average
    pub fn record_response(&mut self, elapsed_ms: f64) {
        self.responses_received += 1;
        let n = self.responses_received as f64;
        self.avg_response_time_ms += (elapsed_ms - self.avg_response_time_ms) / n;
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.last_error = Some(message.into());
    }
}
