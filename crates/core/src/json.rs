//! Entity state as handed over by the application layer.

use serde::Serialize;
use serde_json::Value;

/// One side (previous or current) of an entity mutation.
///
/// Applications either hold an entity as already-encoded JSON text or as a
/// structured value; both normalize to the same canonical bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonInput {
    /// JSON text exactly as the application produced it.
    Raw(Vec<u8>),
    /// An already-parsed JSON value.
    Structured(Value),
}

impl JsonInput {
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Raw(bytes.into())
    }

    /// Capture a serializable entity as a structured value.
    ///
    /// Fails when the entity has no JSON representation (e.g. a map with
    /// non-string keys).
    pub fn from_entity<T: Serialize + ?Sized>(entity: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(entity).map(Self::Structured)
    }

    /// Parse into a JSON value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Raw(bytes) => serde_json::from_slice(bytes),
            Self::Structured(value) => Ok(value.clone()),
        }
    }

    /// Canonical encoding: compact JSON with object members sorted by key.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Raw(bytes) => {
                let value: Value = serde_json::from_slice(bytes)?;
                serde_json::to_vec(&value)
            }
            Self::Structured(value) => serde_json::to_vec(value),
        }
    }
}

impl From<Value> for JsonInput {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl From<&str> for JsonInput {
    fn from(value: &str) -> Self {
        Self::Raw(value.as_bytes().to_vec())
    }
}

impl From<String> for JsonInput {
    fn from(value: String) -> Self {
        Self::Raw(value.into_bytes())
    }
}
