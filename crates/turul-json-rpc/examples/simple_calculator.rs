//! Simple Calculator JSON-RPC Example
//!
//! Dispatches a few raw request bodies (a single call, a batch and a
//! notification) through a calculator handler and prints the response bodies.

use async_trait::async_trait;
use serde_json::{Value, json};
use turul_json_rpc::{
    JsonRpcDispatcher, JsonRpcErrorObject, JsonRpcHandler, RequestParams, ToJsonRpcError,
};

#[derive(Debug, thiserror::Error)]
enum CalculatorError {
    #[error("Missing parameter '{0}'")]
    MissingParam(&'static str),
    #[error("Division by zero")]
    DivisionByZero,
}

impl ToJsonRpcError for CalculatorError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            CalculatorError::MissingParam(_) => JsonRpcErrorObject::invalid_params(&self.to_string()),
            CalculatorError::DivisionByZero => {
                JsonRpcErrorObject::server_error(&self.to_string(), Some(json!({"divisor": 0})))
            }
        }
    }
}

/// Calculator handler that implements basic arithmetic operations
struct CalculatorHandler;

fn operand(params: &Option<RequestParams>, name: &'static str, index: usize) -> Result<f64, CalculatorError> {
    params
        .as_ref()
        .and_then(|p| p.get(name).or_else(|| p.get_index(index)))
        .and_then(Value::as_f64)
        .ok_or(CalculatorError::MissingParam(name))
}

#[async_trait]
impl JsonRpcHandler for CalculatorHandler {
    type Error = CalculatorError;

    async fn handle(&self, method: &str, params: Option<RequestParams>) -> Result<Value, Self::Error> {
        let a = operand(&params, "a", 0)?;
        let b = operand(&params, "b", 1)?;

        match method {
            "add" => Ok(json!(a + b)),
            "subtract" => Ok(json!(a - b)),
            "divide" if b == 0.0 => Err(CalculatorError::DivisionByZero),
            _ => Ok(json!(a / b)),
        }
    }

    async fn handle_notification(&self, method: &str, params: Option<RequestParams>) -> Result<(), Self::Error> {
        println!("notification {} with {:?}", method, params);
        Ok(())
    }

    fn supported_methods(&self) -> Vec<String> {
        vec!["add".to_string(), "subtract".to_string(), "divide".to_string()]
    }
}

#[tokio::main]
async fn main() {
    let mut dispatcher: JsonRpcDispatcher<CalculatorError> = JsonRpcDispatcher::new();
    dispatcher.register_methods(CalculatorHandler.supported_methods(), CalculatorHandler);

    let bodies = [
        r#"{"jsonrpc":"2.0","id":1,"method":"add","params":{"a":5,"b":3}}"#,
        r#"[
            {"jsonrpc":"2.0","id":"s","method":"subtract","params":[10,4]},
            {"jsonrpc":"2.0","id":"d","method":"divide","params":[1,0]},
            {"jsonrpc":"2.0","method":"add","params":[1,1]}
        ]"#,
        r#"{"jsonrpc":"2.0","method":"add","params":[1,1]}"#,
    ];

    for body in bodies {
        match dispatcher.handle_body(body).await {
            Some(response) => println!("<- {}", response),
            None => println!("<- (no response)"),
        }
    }
}
