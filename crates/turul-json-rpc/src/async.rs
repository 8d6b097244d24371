use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    envelope::{Envelope, parse_call, to_body},
    error::JsonRpcErrorObject,
    notification::JsonRpcNotification,
    request::{JsonRpcCall, JsonRpcRequest, RequestParams},
    response::{JsonRpcErrorResponse, JsonRpcMessage},
    types::RequestId,
};

/// Trait for handling JSON-RPC method calls
#[async_trait]
pub trait JsonRpcHandler: Send + Sync {
    /// The error type returned by this handler
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle a JSON-RPC method call.
    /// Returns domain errors only - the dispatcher converts them to JSON-RPC errors
    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
    ) -> Result<Value, Self::Error>;

    /// Handle a JSON-RPC notification (optional - default does nothing)
    async fn handle_notification(
        &self,
        method: &str,
        params: Option<RequestParams>,
    ) -> Result<(), Self::Error> {
        let _ = (method, params);
        Ok(())
    }

    /// List supported methods (optional - used for introspection)
    fn supported_methods(&self) -> Vec<String> {
        vec![]
    }
}

/// Trait for errors that can be converted to JSON-RPC error objects
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    /// Convert this error to a JSON-RPC error object
    fn to_error_object(&self) -> JsonRpcErrorObject;
}

/// JSON-RPC method dispatcher with specific error type
pub struct JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    handlers: HashMap<String, Arc<dyn JsonRpcHandler<Error = E>>>,
    default_handler: Option<Arc<dyn JsonRpcHandler<Error = E>>>,
}

impl<E> JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            default_handler: None,
        }
    }

    /// Register a handler for a specific method
    pub fn register_method<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        self.handlers.insert(method.into(), Arc::new(handler));
    }

    /// Register a handler for multiple methods
    pub fn register_methods<H>(&mut self, methods: Vec<String>, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        let handler_arc: Arc<dyn JsonRpcHandler<Error = E>> = Arc::new(handler);
        for method in methods {
            self.handlers.insert(method, handler_arc.clone());
        }
    }

    /// Set a default handler for unregistered methods
    pub fn set_default_handler<H>(&mut self, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        self.default_handler = Some(Arc::new(handler));
    }

    fn handler_for(&self, method: &str) -> Option<&Arc<dyn JsonRpcHandler<Error = E>>> {
        self.handlers.get(method).or(self.default_handler.as_ref())
    }

    /// Process a JSON-RPC request and return its response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        let Some(handler) = self.handler_for(&request.method) else {
            debug!(method = %request.method, id = %request.id, "Method not found");
            return JsonRpcErrorResponse::method_not_found(request.id, &request.method).into();
        };

        match handler.handle(&request.method, request.params).await {
            Ok(result) => JsonRpcMessage::success(request.id, result),
            Err(domain_error) => {
                debug!(
                    method = %request.method,
                    id = %request.id,
                    error = %domain_error,
                    "Handler returned an error"
                );
                JsonRpcErrorResponse::new(request.id, domain_error.to_error_object()).into()
            }
        }
    }

    /// Process a JSON-RPC notification.
    /// Unknown methods are ignored: notifications never produce a response.
    pub async fn handle_notification(&self, notification: JsonRpcNotification) -> Result<(), E> {
        match self.handler_for(&notification.method) {
            Some(handler) => {
                handler
                    .handle_notification(&notification.method, notification.params)
                    .await
            }
            None => {
                debug!(method = %notification.method, "Ignoring notification for unknown method");
                Ok(())
            }
        }
    }

    /// Process one call; only requests produce a response
    pub async fn handle_call(&self, call: JsonRpcCall) -> Option<JsonRpcMessage> {
        match call {
            JsonRpcCall::Request(request) => Some(self.handle_request(request).await),
            JsonRpcCall::Notification(notification) => {
                let method = notification.method.clone();
                if let Err(e) = self.handle_notification(notification).await {
                    warn!(method = %method, error = %e, "Notification handler failed");
                }
                None
            }
        }
    }

    /// Process a raw request body and return the response body, if any.
    ///
    /// Returns `None` when nothing must be sent back: a single notification
    /// or a batch made only of notifications.
    pub async fn handle_body(&self, body: &str) -> Option<String> {
        let root: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Request body is not valid JSON");
                return render(Envelope::Single(JsonRpcErrorResponse::parse_error().into()));
            }
        };

        match root {
            Value::Array(members) if members.is_empty() => render(Envelope::Single(
                JsonRpcErrorResponse::invalid_request(RequestId::Null).into(),
            )),
            Value::Array(members) => {
                let responses: Vec<JsonRpcMessage> =
                    join_all(members.iter().map(|member| self.handle_member(member)))
                        .await
                        .into_iter()
                        .flatten()
                        .collect();
                if responses.is_empty() {
                    None
                } else {
                    render(Envelope::Batch(responses))
                }
            }
            Value::Object(_) => self
                .handle_member(&root)
                .await
                .and_then(|response| render(Envelope::Single(response))),
            _ => render(Envelope::Single(
                JsonRpcErrorResponse::invalid_request(RequestId::Null).into(),
            )),
        }
    }

    async fn handle_member(&self, member: &Value) -> Option<JsonRpcMessage> {
        match parse_call(member) {
            Ok(call) => self.handle_call(call).await,
            Err(e) => {
                // Keep the caller's id when it is one a call may carry
                let id = member
                    .get("id")
                    .and_then(|raw| RequestId::from_value(raw).ok())
                    .filter(|id| !matches!(id, RequestId::Float(_)))
                    .unwrap_or(RequestId::Null);
                debug!(id = %id, error = %e, "Invalid request");
                Some(JsonRpcErrorResponse::new(id, e.to_error_object()).into())
            }
        }
    }

    /// Get all registered methods
    pub fn registered_methods(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl<E> Default for JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    fn default() -> Self {
        Self::new()
    }
}

fn render(envelope: Envelope<JsonRpcMessage>) -> Option<String> {
    match to_body(&envelope) {
        Ok(body) => Some(body),
        Err(e) => {
            warn!(error = %e, "Failed to serialize response body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(thiserror::Error, Debug)]
    enum TestError {
        #[error("Test error: {0}")]
        TestError(String),
        #[error("Unknown method: {0}")]
        UnknownMethod(String),
    }

    impl ToJsonRpcError for TestError {
        fn to_error_object(&self) -> JsonRpcErrorObject {
            match self {
                TestError::TestError(msg) => JsonRpcErrorObject::server_error(msg, None),
                TestError::UnknownMethod(method) => JsonRpcErrorObject::method_not_found(method),
            }
        }
    }

    struct TestHandler;

    #[async_trait]
    impl JsonRpcHandler for TestHandler {
        type Error = TestError;

        async fn handle(
            &self,
            method: &str,
            params: Option<RequestParams>,
        ) -> Result<Value, Self::Error> {
            match method {
                "add" => {
                    let params = params.unwrap_or(RequestParams::Array(vec![]));
                    let a = params.get_index(0).and_then(Value::as_i64).unwrap_or(0);
                    let b = params.get_index(1).and_then(Value::as_i64).unwrap_or(0);
                    Ok(json!(a + b))
                }
                "error" => Err(TestError::TestError("test error".to_string())),
                _ => Err(TestError::UnknownMethod(method.to_string())),
            }
        }

        fn supported_methods(&self) -> Vec<String> {
            vec!["add".to_string(), "error".to_string()]
        }
    }

    fn dispatcher() -> JsonRpcDispatcher<TestError> {
        let mut dispatcher = JsonRpcDispatcher::new();
        dispatcher.register_methods(TestHandler.supported_methods(), TestHandler);
        dispatcher
    }

    async fn body_json(dispatcher: &JsonRpcDispatcher<TestError>, body: &str) -> Value {
        let out = dispatcher.handle_body(body).await.expect("expected a response body");
        serde_json::from_str(&out).unwrap()
    }

    #[tokio::test]
    async fn test_dispatcher_success() {
        let request = JsonRpcRequest::new_no_params(RequestId::Number(1), "add");
        let response = dispatcher().handle_request(request).await;
        assert_eq!(response.id(), &RequestId::Number(1));
        assert!(!response.is_error());
    }

    #[tokio::test]
    async fn test_dispatcher_method_not_found() {
        let dispatcher: JsonRpcDispatcher<TestError> = JsonRpcDispatcher::new();
        let request = JsonRpcRequest::new_no_params(RequestId::Number(1), "unknown");
        let response = dispatcher.handle_request(request).await;
        assert_eq!(response.id(), &RequestId::Number(1));
        assert_eq!(response.error_object().map(|e| e.code), Some(-32601));
    }

    #[tokio::test]
    async fn test_handler_error_is_converted() {
        let value = body_json(
            &dispatcher(),
            r#"{"jsonrpc":"2.0","id":"e","method":"error"}"#,
        )
        .await;
        assert_eq!(value["id"], "e");
        assert_eq!(value["error"]["code"], -32000);
    }

    #[tokio::test]
    async fn test_single_body() {
        let value = body_json(
            &dispatcher(),
            r#"{"jsonrpc":"2.0","id":1,"method":"add","params":[2,3]}"#,
        )
        .await;
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 1, "result": 5}));
    }

    #[tokio::test]
    async fn test_parse_error_body() {
        let value = body_json(&dispatcher(), "{not json").await;
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_batch_is_single_invalid_request() {
        let value = body_json(&dispatcher(), "[]").await;
        assert!(value.is_object());
        assert_eq!(value["error"]["code"], -32600);
        assert_eq!(value["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_scalar_root_is_invalid_request() {
        let value = body_json(&dispatcher(), "42").await;
        assert_eq!(value["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_notification_produces_no_body() {
        let out = dispatcher()
            .handle_body(r#"{"jsonrpc":"2.0","method":"add","params":[1,1]}"#)
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_all_notification_batch_produces_no_body() {
        let out = dispatcher()
            .handle_body(
                r#"[{"jsonrpc":"2.0","method":"add"},{"jsonrpc":"2.0","method":"missing"}]"#,
            )
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_mixed_batch() {
        let value = body_json(
            &dispatcher(),
            r#"[
                {"jsonrpc":"2.0","id":1,"method":"add","params":[1,2]},
                {"jsonrpc":"2.0","method":"add"},
                {"jsonrpc":"2.0","id":"x","method":"nope"},
                {"foo":"boo"},
                1
            ]"#,
        )
        .await;
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0]["result"], 3);
        assert_eq!(items[1]["error"]["code"], -32601);
        assert_eq!(items[1]["id"], "x");
        assert_eq!(items[2]["error"]["code"], -32600);
        assert_eq!(items[3]["error"]["code"], -32600);
        assert_eq!(items[3]["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_member_keeps_readable_id() {
        let value = body_json(&dispatcher(), r#"{"jsonrpc":"1.0","id":9,"method":"add"}"#).await;
        assert_eq!(value["id"], 9);
        assert_eq!(value["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_float_id_member_answered_with_null_id() {
        let value = body_json(
            &dispatcher(),
            r#"[{"jsonrpc":"2.0","id":1.5,"method":"add","params":[1,2]}]"#,
        )
        .await;
        assert_eq!(value[0]["id"], Value::Null);
        assert_eq!(value[0]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_default_handler() {
        let mut dispatcher: JsonRpcDispatcher<TestError> = JsonRpcDispatcher::new();
        dispatcher.set_default_handler(TestHandler);
        let request = JsonRpcRequest::new_no_params(RequestId::Number(1), "add");
        assert!(!dispatcher.handle_request(request).await.is_error());
        assert!(dispatcher.registered_methods().is_empty());
    }
}
