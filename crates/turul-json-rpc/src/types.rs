use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::envelope::EnvelopeError;

/// Identifier of a JSON-RPC request.
///
/// Equality is type-discriminated: `String("1")` never equals `Number(1)`,
/// and `Float(1.0)` never equals `Number(1)`. Floats compare by bit pattern
/// so that ids can be used as map keys.
#[derive(Debug, Clone)]
pub enum RequestId {
    String(String),
    Number(i64),
    Float(f64),
    Null,
}

impl RequestId {
    /// Parse an id from its JSON representation.
    ///
    /// Strings, integers, floats and `null` are accepted. Anything else, and
    /// integers that do not fit in an `i64`, is an [`EnvelopeError::InvalidIdShape`].
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        match value {
            Value::String(s) => Ok(RequestId::String(s.clone())),
            Value::Null => Ok(RequestId::Null),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(RequestId::Number(i))
                } else if n.is_f64() {
                    n.as_f64()
                        .map(RequestId::Float)
                        .ok_or_else(|| EnvelopeError::InvalidIdShape(value.to_string()))
                } else {
                    Err(EnvelopeError::InvalidIdShape(value.to_string()))
                }
            }
            other => Err(EnvelopeError::InvalidIdShape(other.to_string())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestId::String(s) => Value::String(s.clone()),
            RequestId::Number(n) => Value::Number((*n).into()),
            RequestId::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            RequestId::Null => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, RequestId::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for RequestId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RequestId::String(a), RequestId::String(b)) => a == b,
            (RequestId::Number(a), RequestId::Number(b)) => a == b,
            (RequestId::Float(a), RequestId::Float(b)) => a.to_bits() == b.to_bits(),
            (RequestId::Null, RequestId::Null) => true,
            _ => false,
        }
    }
}

impl Eq for RequestId {}

impl Hash for RequestId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            RequestId::String(s) => s.hash(state),
            RequestId::Number(n) => n.hash(state),
            RequestId::Float(f) => f.to_bits().hash(state),
            RequestId::Null => {}
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Float(n) => write!(f, "{}", n),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<f64> for RequestId {
    fn from(n: f64) -> Self {
        RequestId::Float(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            RequestId::String(s) => serializer.serialize_str(s),
            RequestId::Number(n) => serializer.serialize_i64(*n),
            RequestId::Float(f) => serializer.serialize_f64(*f),
            RequestId::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RequestId::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// JSON-RPC version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => crate::JSONRPC_VERSION,
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "2.0" => Ok(JsonRpcVersion::V2_0),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}
