use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::EnvelopeError;
use crate::notification::JsonRpcNotification;
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Build params from an arbitrary JSON value.
    ///
    /// Only objects and arrays are valid params; anything else is an
    /// [`EnvelopeError::UnsupportedParamsShape`].
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        match value {
            Value::Object(map) => Ok(RequestParams::Object(map)),
            Value::Array(vec) => Ok(RequestParams::Array(vec)),
            other => Err(EnvelopeError::UnsupportedParamsShape(shape_name(&other))),
        }
    }

    /// Get a parameter by name (for object params only)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (for array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RequestParams::Object(map) => map.is_empty(),
            RequestParams::Array(vec) => vec.is_empty(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map.clone()),
            RequestParams::Array(arr) => Value::Array(arr.clone()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map),
            RequestParams::Array(arr) => Value::Array(arr),
        }
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

pub(crate) fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            method: method.into(),
            params,
        }
    }

    /// Create a new request with no parameters
    pub fn new_no_params(id: RequestId, method: impl Into<String>) -> Self {
        Self::new(id, method, None)
    }

    /// Create a request carrying a freshly generated id
    pub fn with_generated_id(method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self::new(crate::id::generate_id(), method, params)
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.get_index(index)
    }
}

/// An outgoing call: either a request expecting exactly one response, or a
/// notification expecting none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcCall {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl JsonRpcCall {
    pub fn method(&self) -> &str {
        match self {
            JsonRpcCall::Request(req) => &req.method,
            JsonRpcCall::Notification(notif) => &notif.method,
        }
    }

    pub fn params(&self) -> Option<&RequestParams> {
        match self {
            JsonRpcCall::Request(req) => req.params.as_ref(),
            JsonRpcCall::Notification(notif) => notif.params.as_ref(),
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, JsonRpcCall::Request(_))
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcCall::Notification(_))
    }

    /// The request id, `None` for notifications
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcCall::Request(req) => Some(&req.id),
            JsonRpcCall::Notification(_) => None,
        }
    }
}

impl From<JsonRpcRequest> for JsonRpcCall {
    fn from(request: JsonRpcRequest) -> Self {
        JsonRpcCall::Request(request)
    }
}

impl From<JsonRpcNotification> for JsonRpcCall {
    fn from(notification: JsonRpcNotification) -> Self {
        JsonRpcCall::Notification(notification)
    }
}
