//! Read-only views over a completed [`CallContext`]

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::context::CallContext;
use crate::envelope::Envelope;
use crate::error::{CallError, JsonRpcErrorObject};
use crate::payload::{PayloadSerializer, VERBATIM};
use crate::response::{JsonRpcErrorResponse, JsonRpcMessage};
use crate::types::RequestId;

/// An error response with its `data` decoded into an application type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRpcError<E> {
    pub code: i64,
    pub message: String,
    pub data: Option<E>,
}

impl<E> fmt::Display for TypedRpcError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.code, self.message)
    }
}

fn ensure_complete(context: &CallContext) -> Result<(), CallError> {
    if context.is_complete() {
        Ok(())
    } else {
        Err(CallError::IncompleteContext(context.state()))
    }
}

fn call_shape(context: &CallContext) -> &'static str {
    context.call().map(Envelope::shape_name).unwrap_or("no")
}

fn decode_result<T: DeserializeOwned>(
    context: &CallContext,
    serializer: &dyn PayloadSerializer,
    response: Option<&JsonRpcMessage>,
    id: Option<&RequestId>,
) -> Result<T, CallError> {
    match response {
        None => Err(CallError::NoResponse { id: id.cloned() }),
        Some(JsonRpcMessage::Error(err)) => Err(CallError::RemoteError {
            error: err.error.clone(),
            context: Box::new(context.clone()),
        }),
        Some(JsonRpcMessage::Response(resp)) => Ok(serializer.deserialize(resp.result.clone())?),
    }
}

fn decode_error<E: DeserializeOwned>(
    serializer: &dyn PayloadSerializer,
    error: &JsonRpcErrorObject,
) -> TypedRpcError<E> {
    let data = error.data.clone().and_then(|data| {
        serializer
            .deserialize::<E>(data.clone())
            .or_else(|err| {
                debug!(
                    serializer = serializer.name(),
                    error = %err,
                    "Error data did not decode, retrying verbatim"
                );
                let verbatim: &dyn PayloadSerializer = &VERBATIM;
                verbatim.deserialize::<E>(data)
            })
            .ok()
    });

    TypedRpcError {
        code: error.code,
        message: error.message.clone(),
        data,
    }
}

/// Result view for a single call
#[derive(Debug)]
pub struct SingleResult<'a> {
    context: &'a CallContext,
    serializer: &'a dyn PayloadSerializer,
    response: Option<&'a JsonRpcMessage>,
}

impl<'a> SingleResult<'a> {
    pub fn new(
        context: &'a CallContext,
        serializer: &'a dyn PayloadSerializer,
    ) -> Result<Self, CallError> {
        ensure_complete(context)?;
        if !matches!(context.call(), Some(Envelope::Single(_))) {
            return Err(CallError::WrongContextShape {
                expected: "single",
                actual: call_shape(context),
            });
        }

        let response = match context.response() {
            Some(Envelope::Single(response)) => Some(response),
            _ => None,
        };

        Ok(Self {
            context,
            serializer,
            response,
        })
    }

    pub fn context(&self) -> &'a CallContext {
        self.context
    }

    pub fn response(&self) -> Option<&'a JsonRpcMessage> {
        self.response
    }

    /// The decoded result, or the reason there is none
    pub fn get_result_or_fail<T: DeserializeOwned>(&self) -> Result<T, CallError> {
        decode_result(self.context, self.serializer, self.response, None)
    }

    pub fn as_result<T: DeserializeOwned>(&self) -> Option<T> {
        self.get_result_or_fail().ok()
    }

    pub fn raw_result(&self) -> Option<&'a Value> {
        self.response.and_then(JsonRpcMessage::result)
    }

    pub fn has_error(&self) -> Result<bool, CallError> {
        self.response
            .map(JsonRpcMessage::is_error)
            .ok_or(CallError::NoResponse { id: None })
    }

    pub fn as_raw_error(&self) -> Option<&'a JsonRpcErrorObject> {
        self.response.and_then(JsonRpcMessage::error_object)
    }

    pub fn as_typed_error<E: DeserializeOwned>(&self) -> Option<TypedRpcError<E>> {
        self.as_raw_error()
            .map(|error| decode_error(self.serializer, error))
    }
}

/// Result view for a batch call, indexed by response id
#[derive(Debug)]
pub struct BatchResult<'a> {
    context: &'a CallContext,
    serializer: &'a dyn PayloadSerializer,
    ids: Vec<&'a RequestId>,
    by_id: HashMap<&'a RequestId, &'a JsonRpcMessage>,
    orphan_errors: Vec<&'a JsonRpcErrorResponse>,
}

impl<'a> BatchResult<'a> {
    pub fn new(
        context: &'a CallContext,
        serializer: &'a dyn PayloadSerializer,
    ) -> Result<Self, CallError> {
        ensure_complete(context)?;
        if !matches!(context.call(), Some(Envelope::Batch(_))) {
            return Err(CallError::WrongContextShape {
                expected: "batch",
                actual: call_shape(context),
            });
        }

        let mut ids = Vec::new();
        let mut by_id = HashMap::new();
        let mut orphan_errors = Vec::new();

        if let Some(Envelope::Batch(responses)) = context.response() {
            for response in responses {
                match response {
                    JsonRpcMessage::Error(err) if err.id.is_null() => orphan_errors.push(err),
                    _ => {
                        let id = response.id();
                        if by_id.insert(id, response).is_none() {
                            ids.push(id);
                        }
                    }
                }
            }
        }

        Ok(Self {
            context,
            serializer,
            ids,
            by_id,
            orphan_errors,
        })
    }

    pub fn context(&self) -> &'a CallContext {
        self.context
    }

    /// Ids that have a response, in the order the server sent them
    pub fn ids(&self) -> &[&'a RequestId] {
        &self.ids
    }

    /// Error responses carrying a null id; these cannot be matched to a request.
    pub fn orphan_errors(&self) -> &[&'a JsonRpcErrorResponse] {
        &self.orphan_errors
    }

    pub fn response(&self, id: &RequestId) -> Option<&'a JsonRpcMessage> {
        self.by_id.get(id).copied()
    }

    pub fn get_result_or_fail<T: DeserializeOwned>(&self, id: &RequestId) -> Result<T, CallError> {
        decode_result(self.context, self.serializer, self.response(id), Some(id))
    }

    pub fn as_result<T: DeserializeOwned>(&self, id: &RequestId) -> Option<T> {
        self.get_result_or_fail(id).ok()
    }

    pub fn has_error(&self, id: &RequestId) -> Result<bool, CallError> {
        self.response(id)
            .map(JsonRpcMessage::is_error)
            .ok_or_else(|| CallError::NoResponse {
                id: Some(id.clone()),
            })
    }

    pub fn as_raw_error(&self, id: &RequestId) -> Option<&'a JsonRpcErrorObject> {
        self.response(id).and_then(JsonRpcMessage::error_object)
    }

    pub fn as_typed_error<E: DeserializeOwned>(&self, id: &RequestId) -> Option<TypedRpcError<E>> {
        self.as_raw_error(id)
            .map(|error| decode_error(self.serializer, error))
    }
}
