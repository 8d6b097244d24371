//! HTTP transport implementation for the JSON-RPC client

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, TransportError};
use crate::transport::{Transport, TransportResponse, TransportStatistics};

/// HTTP transport: one `POST` per exchange
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client
    client: Client,
    /// Statistics
    stats: Arc<parking_lot::Mutex<TransportStatistics>>,
}

impl HttpTransport {
    /// Create a new HTTP transport from client configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.timeouts.connect)
            .timeout(config.timeouts.request);

        if let Some(user_agent) = &config.connection.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        if let Some(headers) = &config.connection.headers {
            builder = builder.default_headers(header_map(headers)?);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client))
    }

    /// Create HTTP transport with custom client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            stats: Arc::new(parking_lot::Mutex::new(TransportStatistics::default())),
        }
    }

    /// Update statistics
    fn update_stats<F>(&self, update_fn: F)
    where
        F: FnOnce(&mut TransportStatistics),
    {
        let mut stats = self.stats.lock();
        update_fn(&mut stats);
    }
}

fn header_map(headers: &std::collections::HashMap<String, String>) -> ClientResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::config(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ClientError::config(format!("Invalid value for header '{}': {}", name, e))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, url: &Url, body: Vec<u8>) -> Result<TransportResponse, TransportError> {
        debug!(url = %url, bytes = body.len(), "Sending HTTP request");
        self.update_stats(|stats| stats.requests_sent += 1);
        let started = Instant::now();

        let result = async {
            let response = self
                .client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>(TransportResponse::new(status, headers, bytes.to_vec()))
        }
        .await;

        match result {
            Ok(response) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                self.update_stats(|stats| stats.record_response(elapsed_ms));
                debug!(
                    url = %url,
                    status = response.status,
                    bytes = response.body.len(),
                    elapsed_ms,
                    "Received HTTP response"
                );
                Ok(response)
            }
            Err(e) => {
                let error = TransportError::from(e);
                warn!(url = %url, error = %error, "HTTP request failed");
                self.update_stats(|stats| stats.record_error(error.to_string()));
                Err(error)
            }
        }
    }

    fn statistics(&self) -> TransportStatistics {
        self.stats.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_transport_from_default_config() {
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        assert_eq!(transport.statistics().requests_sent, 0);
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut config = ClientConfig::default();
        config.connection.headers = Some(HashMap::from([(
            "bad header".to_string(),
            "value".to_string(),
        )]));
        assert!(matches!(
            HttpTransport::new(&config),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_counted() {
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/rpc", addr)).unwrap();
        let result = transport.send(&url, b"{}".to_vec()).await;
        assert!(result.is_err());

        let stats = transport.statistics();
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.errors, 1);
        assert!(stats.last_error.is_some());
    }
}
