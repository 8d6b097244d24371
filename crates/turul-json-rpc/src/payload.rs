//! Payload serializers
//!
//! A payload serializer shapes the application data carried in `params`,
//! `result` and `error.data`. It is chosen per call (or per handler) and is
//! independent from the envelope codec, so a client can speak camelCase to
//! one service and snake_case to another without touching `id`, `method`,
//! `jsonrpc`, `result` or `error`.
//!
//! Rust types are assumed to use snake_case field names. Outgoing payloads
//! are renamed into the wire convention, incoming payloads are renamed back.
//! A key is only renamed when the rename reverses exactly, so map data such as
//! `"USD"` or `"X-Trace"` and digit-bearing names like `address_v2` survive.

use std::fmt;

use convert_case::{Boundary, Case, Casing};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::envelope::EnvelopeError;
use crate::request::RequestParams;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to deserialize payload: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] EnvelopeError),
}

/// Naming convention applied to payload object keys
pub trait PayloadSerializer: Send + Sync + fmt::Debug {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Rename keys from the Rust convention to the wire convention
    fn to_wire(&self, value: Value) -> Value;

    /// Rename keys from the wire convention to the Rust convention
    fn from_wire(&self, value: Value) -> Value;
}

impl dyn PayloadSerializer + '_ {
    /// Serialize a value into request params.
    ///
    /// Fails with [`EnvelopeError::UnsupportedParamsShape`] unless the value
    /// serializes to an object or an array.
    pub fn serialize_params<T: Serialize + ?Sized>(
        &self,
        params: &T,
    ) -> Result<RequestParams, PayloadError> {
        let value = self.serialize(params)?;
        Ok(RequestParams::from_value(value)?)
    }

    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, PayloadError> {
        let value = serde_json::to_value(value).map_err(PayloadError::Serialize)?;
        Ok(self.to_wire(value))
    }

    pub fn deserialize<T: DeserializeOwned>(&self, value: Value) -> Result<T, PayloadError> {
        serde_json::from_value(self.from_wire(value)).map_err(PayloadError::Deserialize)
    }
}

/// snake_case on the wire
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

/// camelCase on the wire
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCase;

/// Keys pass through untouched. This is the envelope convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

pub static SNAKE_CASE: SnakeCase = SnakeCase;
pub static CAMEL_CASE: CamelCase = CamelCase;
pub static VERBATIM: Verbatim = Verbatim;

impl PayloadSerializer for SnakeCase {
    fn name(&self) -> &'static str {
        "snake_case"
    }

    fn to_wire(&self, value: Value) -> Value {
        value
    }

    fn from_wire(&self, value: Value) -> Value {
        value
    }
}

impl PayloadSerializer for CamelCase {
    fn name(&self) -> &'static str {
        "camelCase"
    }

    fn to_wire(&self, value: Value) -> Value {
        rename_keys(value, &|key| reversible(key, snake_to_camel, camel_to_snake))
    }

    fn from_wire(&self, value: Value) -> Value {
        rename_keys(value, &|key| reversible(key, camel_to_snake, snake_to_camel))
    }
}

impl PayloadSerializer for Verbatim {
    fn name(&self) -> &'static str {
        "verbatim"
    }

    fn to_wire(&self, value: Value) -> Value {
        value
    }

    fn from_wire(&self, value: Value) -> Value {
        value
    }
}

fn snake_to_camel(key: &str) -> String {
    key.from_case(Case::Snake).to_case(Case::Camel)
}

// Split on lower-to-upper only, so "addressV2" stays two words
fn camel_to_snake(key: &str) -> String {
    key.with_boundaries(&[Boundary::LowerUpper])
        .to_case(Case::Snake)
}

/// Apply `forward` only when `back` restores the original key
fn reversible(key: String, forward: fn(&str) -> String, back: fn(&str) -> String) -> String {
    let renamed = forward(&key);
    if back(&renamed) == key { renamed } else { key }
}

fn rename_keys(value: Value, rename: &dyn Fn(String) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (rename(key), rename_keys(value, rename)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| rename_keys(v, rename)).collect())
        }
        other => other,
    }
}
