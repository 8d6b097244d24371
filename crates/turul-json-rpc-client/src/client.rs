//! Main JSON-RPC client implementation

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use turul_json_rpc::envelope::{Envelope, EnvelopeError, parse_responses, to_body};
use turul_json_rpc::{
    CallContext, HttpResponseInfo, JsonRpcCall, JsonRpcNotification, JsonRpcRequest,
    PayloadSerializer, RequestId, SingleResult,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, TransportError};
use crate::transport::{HttpTransport, Transport, TransportStatistics};

/// JSON-RPC client over a [`Transport`].
///
/// Every exchange gets a fresh [`CallContext`] that is stepped through each
/// state; a failure carries the context up to the failing step.
#[derive(Clone)]
pub struct JsonRpcClient {
    /// Server endpoint; relative request paths resolve against it
    base_url: Url,
    /// Optional path below the base url for every exchange
    path: Option<String>,
    /// Transport layer
    transport: Arc<dyn Transport>,
    /// Configuration
    config: Arc<ClientConfig>,
    /// Convention for params, results and error data
    serializer: &'static dyn PayloadSerializer,
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("base_url", &self.base_url.as_str())
            .field("path", &self.path)
            .field("serializer", &self.serializer.name())
            .finish()
    }
}

impl JsonRpcClient {
    /// Create a new client with the given transport
    pub fn new(base_url: Url, transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let serializer = config.payload_naming.serializer();
        Self {
            base_url,
            path: None,
            transport,
            config: Arc::new(config),
            serializer,
        }
    }

    /// Use `serializer` for params, results and error data of every call
    pub fn with_payload_serializer(mut self, serializer: &'static dyn PayloadSerializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Send every exchange to `path`, relative to the base url
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn payload_serializer(&self) -> &'static dyn PayloadSerializer {
        self.serializer
    }

    /// Get transport statistics
    pub fn transport_stats(&self) -> TransportStatistics {
        self.transport.statistics()
    }

    /// Call `method` with `params` and decode its result
    pub async fn call<P, R>(&self, method: &str, params: &P) -> ClientResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = self.serializer.serialize_params(params)?;
        let request = JsonRpcRequest::with_generated_id(method, Some(params));
        self.call_request(request).await
    }

    /// Call `method` without params and decode its result
    pub async fn call_without_params<R>(&self, method: &str) -> ClientResult<R>
    where
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest::with_generated_id(method, None);
        self.call_request(request).await
    }

    async fn call_request<R: DeserializeOwned>(&self, request: JsonRpcRequest) -> ClientResult<R> {
        let ctx = self.send_single(request.into()).await?;
        let result = SingleResult::new(&ctx, self.serializer)?;
        Ok(result.get_result_or_fail()?)
    }

    /// Send a notification; no response is expected
    pub async fn notify<P>(&self, method: &str, params: &P) -> ClientResult<()>
    where
        P: Serialize + ?Sized,
    {
        let params = self.serializer.serialize_params(params)?;
        let notification = JsonRpcNotification::new(method, Some(params));
        self.send_single(notification.into()).await?;
        Ok(())
    }

    /// Start building a batch
    pub fn batch(&self) -> BatchBuilder<'_> {
        BatchBuilder {
            client: self,
            calls: Vec::new(),
        }
    }

    /// Run one exchange for a single call and return its completed context
    pub async fn send_single(&self, call: JsonRpcCall) -> ClientResult<CallContext> {
        self.exchange(Envelope::Single(call)).await
    }

    /// Run one exchange for a batch and return its completed context
    pub async fn send_batch(&self, calls: Vec<JsonRpcCall>) -> ClientResult<CallContext> {
        self.exchange(Envelope::Batch(calls)).await
    }

    async fn exchange(&self, call: Envelope<JsonRpcCall>) -> ClientResult<CallContext> {
        let mut ctx = CallContext::new();

        let url = match &self.path {
            Some(path) => {
                ctx.with_request_url(path.as_str())?;
                self.base_url.join(path).map_err(|e| {
                    let err = TransportError::InvalidUrl(format!("{}: {}", path, e));
                    ctx.with_error(err.to_string());
                    ClientError::transport(err, &ctx)
                })?
            }
            None => self.base_url.clone(),
        };

        let body = to_body(&call);
        let method = call.iter().next().map(|c| c.method().to_string());
        let members = call.len();
        match call {
            Envelope::Single(call) => ctx.with_single_call(call)?,
            Envelope::Batch(calls) => ctx.with_batch_call(calls)?,
        };
        let body = body.map_err(|e| ctx.framing_error(e))?;

        if self.config.logging.log_requests {
            info!(url = %url, body = %body, "JSON-RPC request");
        } else {
            debug!(url = %url, method = ?method, members, "Sending JSON-RPC call");
        }

        let request_timeout = self.config.timeouts.request;
        let send = self.transport.send(&url, body.into_bytes());
        let response = match timeout(request_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                ctx.with_error(e.to_string());
                return Err(ClientError::transport(e, &ctx));
            }
            Err(_) => {
                let err = TransportError::Timeout(request_timeout);
                warn!(url = %url, method = ?method, "JSON-RPC call timed out");
                ctx.with_error(err.to_string());
                return Err(ClientError::transport(err, &ctx));
            }
        };

        let text = response.body_text();
        let info = HttpResponseInfo::new(response.status).with_headers(response.headers);
        ctx.with_http_response(info)?;
        ctx.with_http_body(text.as_str())?;

        if self.config.logging.log_responses {
            info!(url = %url, status = response.status, body = %text, "JSON-RPC response");
        }

        let trimmed = text.trim();
        if trimmed.is_empty() && ctx.expected_response_count() == 0 {
            debug!(url = %url, "No response expected");
            return Ok(ctx);
        }
        if trimmed.is_empty() || trimmed == "null" {
            ctx.with_single_response(None)?;
            return Ok(ctx);
        }

        match parse_responses(trimmed) {
            Ok(Envelope::Single(response)) => ctx.with_single_response(Some(response))?,
            Ok(Envelope::Batch(responses)) => ctx.with_batch_response(responses)?,
            Err(EnvelopeError::EmptyBatch) => ctx.with_batch_response(Vec::new())?,
            Err(e) => return Err(ctx.framing_error(e).into()),
        };

        Ok(ctx)
    }
}

/// Collects calls for one batch exchange
#[derive(Debug)]
pub struct BatchBuilder<'a> {
    client: &'a JsonRpcClient,
    calls: Vec<JsonRpcCall>,
}

impl BatchBuilder<'_> {
    /// Add a request and return its generated id for the later lookup
    pub fn request<P>(&mut self, method: &str, params: &P) -> ClientResult<RequestId>
    where
        P: Serialize + ?Sized,
    {
        let params = self.client.serializer.serialize_params(params)?;
        Ok(self.push_request(JsonRpcRequest::with_generated_id(method, Some(params))))
    }

    pub fn request_without_params(&mut self, method: &str) -> RequestId {
        self.push_request(JsonRpcRequest::with_generated_id(method, None))
    }

    fn push_request(&mut self, request: JsonRpcRequest) -> RequestId {
        let id = request.id.clone();
        self.calls.push(request.into());
        id
    }

    pub fn notification<P>(&mut self, method: &str, params: &P) -> ClientResult<()>
    where
        P: Serialize + ?Sized,
    {
        let params = self.client.serializer.serialize_params(params)?;
        self.calls
            .push(JsonRpcNotification::new(method, Some(params)).into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Send the batch; read results with [`turul_json_rpc::BatchResult`]
    pub async fn send(self) -> ClientResult<CallContext> {
        self.client.send_batch(self.calls).await
    }
}

/// Builder for creating JSON-RPC clients
#[derive(Default)]
pub struct JsonRpcClientBuilder {
    base_url: Option<Url>,
    transport: Option<Arc<dyn Transport>>,
    config: Option<ClientConfig>,
    serializer: Option<&'static dyn PayloadSerializer>,
    path: Option<String>,
}

impl JsonRpcClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server endpoint
    pub fn with_url(mut self, url: &str) -> ClientResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::config(format!(
                "Unsupported scheme for JSON-RPC over HTTP: {}",
                url.scheme()
            )));
        }
        self.base_url = Some(url);
        Ok(self)
    }

    /// Set transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_payload_serializer(mut self, serializer: &'static dyn PayloadSerializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Build the client; an [`HttpTransport`] is created when none was set
    pub fn build(self) -> ClientResult<JsonRpcClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::config("Server URL must be set before building client"))?;
        let config = self.config.unwrap_or_default();
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config)?),
        };

        let mut client = JsonRpcClient::new(base_url, transport, config);
        if let Some(serializer) = self.serializer {
            client = client.with_payload_serializer(serializer);
        }
        if let Some(path) = self.path {
            client = client.with_path(path);
        }
        Ok(client)
    }
}
