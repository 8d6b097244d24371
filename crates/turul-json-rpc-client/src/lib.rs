//! # JSON-RPC Client Library
//!
//! An HTTP client for JSON-RPC 2.0 built on [`turul_json_rpc`]. Every exchange
//! is tracked by a [`CallContext`](turul_json_rpc::CallContext), so a failed
//! call reports the exact step that broke along with the request, the HTTP
//! status and the raw body.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use turul_json_rpc_client::JsonRpcClientBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = JsonRpcClientBuilder::new()
//!         .with_url("http://localhost:8080/api/")?
//!         .with_path("rpc")
//!         .build()?;
//!
//!     let sum: i64 = client.call("add", &[1, 2]).await?;
//!     println!("1 + 2 = {}", sum);
//!
//!     client.notify("log", &serde_json::json!({"line": "done"})).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Batches
//!
//! ```rust,no_run
//! # async fn run(client: turul_json_rpc_client::JsonRpcClient) -> Result<(), Box<dyn std::error::Error>> {
//! use turul_json_rpc::BatchResult;
//!
//! let mut batch = client.batch();
//! let add = batch.request("add", &[1, 2])?;
//! let sub = batch.request("subtract", &[5, 3])?;
//! batch.notification("log", &["batch sent"])?;
//!
//! let ctx = batch.send().await?;
//! let results = BatchResult::new(&ctx, client.payload_serializer())?;
//! let sum: i64 = results.get_result_or_fail(&add)?;
//! let difference: Option<i64> = results.as_result(&sub);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod transport;

// Re-export main types
pub use client::{BatchBuilder, JsonRpcClient, JsonRpcClientBuilder};
pub use config::{ClientConfig, ConnectionConfig, LoggingConfig, PayloadNaming, TimeoutConfig};
pub use error::{ClientError, ClientResult, TransportError};

// Re-export transport types
pub use transport::{HttpTransport, Transport, TransportResponse, TransportStatistics};
