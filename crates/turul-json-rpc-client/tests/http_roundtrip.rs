//! Client against a real hyper server that answers through `JsonRpcDispatcher`

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use turul_json_rpc::payload::CAMEL_CASE;
use turul_json_rpc::{
    BatchResult, CallError, JsonRpcDispatcher, JsonRpcErrorObject, JsonRpcHandler, RequestParams,
    ToJsonRpcError,
};
use turul_json_rpc_client::{ClientError, JsonRpcClient, JsonRpcClientBuilder};

#[derive(Debug, thiserror::Error)]
enum CalcError {
    #[error("Expected two numbers")]
    BadOperands,
    #[error("Unknown operation {0}")]
    Unknown(String),
}

impl ToJsonRpcError for CalcError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            CalcError::BadOperands => JsonRpcErrorObject::invalid_params(&self.to_string()),
            CalcError::Unknown(_) => JsonRpcErrorObject::server_error(&self.to_string(), None),
        }
    }
}

struct Calculator;

#[async_trait]
impl JsonRpcHandler for Calculator {
    type Error = CalcError;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
    ) -> Result<Value, CalcError> {
        let params = params.ok_or(CalcError::BadOperands)?;
        let operand = |name: &str, index: usize| {
            params
                .get(name)
                .or_else(|| params.get_index(index))
                .and_then(Value::as_i64)
                .ok_or(CalcError::BadOperands)
        };
        let (a, b) = (operand("left_operand", 0)?, operand("right_operand", 1)?);

        match method {
            "add" => Ok(json!(a + b)),
            "subtract" => Ok(json!(a - b)),
            "describe" => Ok(json!({"sum_total": a + b, "is_positive": a + b > 0})),
            other => Err(CalcError::Unknown(other.to_string())),
        }
    }

    fn supported_methods(&self) -> Vec<String> {
        ["add", "subtract", "describe", "explode"]
            .iter()
            .map(|m| m.to_string())
            .collect()
    }
}

async fn handle_http(
    req: Request<Incoming>,
    dispatcher: Arc<JsonRpcDispatcher<CalcError>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let reply = |status: StatusCode, body: String| {
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    };

    if req.uri().path() != "/api/rpc" {
        return Ok(reply(StatusCode::NOT_FOUND, String::new()));
    }

    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Ok(reply(StatusCode::BAD_REQUEST, String::new())),
    };
    let body = String::from_utf8_lossy(&bytes);

    match dispatcher.handle_body(&body).await {
        Some(out) => Ok(reply(StatusCode::OK, out)),
        None => Ok(reply(StatusCode::OK, String::new())),
    }
}

async fn start_server() -> SocketAddr {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut dispatcher = JsonRpcDispatcher::new();
    dispatcher.register_methods(Calculator.supported_methods(), Calculator);
    let dispatcher = Arc::new(dispatcher);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| handle_http(req, dispatcher.clone()));
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    addr
}

async fn client() -> JsonRpcClient {
    let addr = start_server().await;
    JsonRpcClientBuilder::new()
        .with_url(&format!("http://{}/api/", addr))
        .unwrap()
        .with_path("rpc")
        .build()
        .unwrap()
}

#[derive(Debug, Serialize)]
struct Operands {
    left_operand: i64,
    right_operand: i64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Description {
    sum_total: i64,
    is_positive: bool,
}

#[tokio::test]
async fn single_call_round_trip() {
    let client = client().await;
    let sum: i64 = client.call("add", &[1, 2]).await.unwrap();
    assert_eq!(sum, 3);

    let stats = client.transport_stats();
    assert_eq!(stats.requests_sent, 1);
    assert_eq!(stats.responses_received, 1);
}

#[tokio::test]
async fn named_params_round_trip() {
    let client = client().await;
    let description: Description = client
        .call(
            "describe",
            &Operands {
                left_operand: 4,
                right_operand: -1,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        description,
        Description {
            sum_total: 3,
            is_positive: true
        }
    );
}

#[tokio::test]
async fn camel_case_client_against_snake_case_server() {
    // Named lookups miss on camelCase keys and an object has no positions
    let client = client().await.with_payload_serializer(&CAMEL_CASE);
    let err = client
        .call::<_, i64>(
            "add",
            &Operands {
                left_operand: 1,
                right_operand: 1,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some(-32602));
}

#[tokio::test]
async fn remote_errors() {
    let client = client().await;

    let err = client.call_without_params::<i64>("add").await.unwrap_err();
    assert_eq!(err.error_code(), Some(-32602));

    let err = client.call::<_, i64>("missing", &[1, 2]).await.unwrap_err();
    assert_eq!(err.error_code(), Some(-32601));

    let err = client.call::<_, i64>("explode", &[1, 2]).await.unwrap_err();
    assert_eq!(err.error_code(), Some(-32000));
    let rendered = err.to_string();
    assert!(rendered.contains("explode"));
}

#[tokio::test]
async fn notification_gets_no_body() {
    let client = client().await;
    client.notify("add", &[1, 2]).await.unwrap();
}

#[tokio::test]
async fn mixed_batch() {
    let client = client().await;
    let mut batch = client.batch();
    let add = batch.request("add", &[10, 5]).unwrap();
    batch.notification("add", &[0, 0]).unwrap();
    let sub = batch.request("subtract", &[10, 5]).unwrap();
    let bad = batch.request_without_params("add");

    let ctx = batch.send().await.unwrap();
    assert_eq!(ctx.expected_response_count(), 3);

    let results = BatchResult::new(&ctx, client.payload_serializer()).unwrap();
    assert_eq!(results.get_result_or_fail::<i64>(&add).unwrap(), 15);
    assert_eq!(results.as_result::<i64>(&sub), Some(5));
    assert!(results.has_error(&bad).unwrap());
    assert_eq!(results.as_raw_error(&bad).map(|e| e.code), Some(-32602));
    assert!(results.orphan_errors().is_empty());
}

#[tokio::test]
async fn notification_only_batch() {
    let client = client().await;
    let mut batch = client.batch();
    batch.notification("add", &[1, 1]).unwrap();
    batch.notification("subtract", &[1, 1]).unwrap();

    let ctx = batch.send().await.unwrap();
    assert!(ctx.is_complete());
    assert_eq!(ctx.http_body(), Some(""));
}

#[tokio::test]
async fn wrong_path_is_http_status_error() {
    let addr = start_server().await;
    let client = JsonRpcClientBuilder::new()
        .with_url(&format!("http://{}/api/", addr))
        .unwrap()
        .with_path("nowhere")
        .build()
        .unwrap();

    let err = client.call::<_, i64>("add", &[1, 2]).await.unwrap_err();
    let ClientError::Call(CallError::UnexpectedHttpStatus { status, context }) = err else {
        panic!("expected an HTTP status error");
    };
    assert_eq!(status, 404);
    assert_eq!(context.request_url(), Some("nowhere"));
    assert!(context.response().is_none());
    assert!(context.first_error().is_some_and(|e| e.contains("404")));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = JsonRpcClientBuilder::new()
        .with_url(&format!("http://{}/", addr))
        .unwrap()
        .build()
        .unwrap();
    let err = client.call::<_, i64>("add", &[1, 2]).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(client.transport_stats().errors, 1);

    let context = err.context().unwrap();
    assert!(context.call().is_some());
    assert!(context.http_response().is_none());
    assert!(context.first_error().is_some());
}
