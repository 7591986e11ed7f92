//! Keys and opaque values.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A key in the store. Keys are compared and ordered as strings.
pub type Key = String;

/// An opaque, JSON-representable payload.
///
/// The engine never looks inside a `Value`; it only stores, compares and
/// moves it. [`Value::encode`] and [`Value::decode`] define the byte form
/// written to the commit log and the history sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(serde_json::Value);

impl Value {
    /// Wraps a JSON document.
    #[must_use]
    pub fn new(json: serde_json::Value) -> Self {
        Self(json)
    }

    /// Returns the wrapped JSON document.
    #[must_use]
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Unwraps into the JSON document.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }

    /// Encodes the value as compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(&self.0).map_err(|e| CoreError::codec(e.to_string()))
    }

    /// Decodes a value produced by [`Value::encode`].
    ///
    /// # Errors
    ///
    /// Returns a codec error if `bytes` is not valid JSON.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(bytes)
            .map(Self)
            .map_err(|e| CoreError::codec(e.to_string()))
    }

    /// Parses a value from JSON text (CLI and shell input).
    ///
    /// # Errors
    ///
    /// Returns a codec error if `text` is not valid JSON.
    pub fn parse(text: &str) -> CoreResult<Self> {
        Self::decode(text.as_bytes())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self(json)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.0
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self(serde_json::Value::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self(serde_json::Value::from(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self(serde_json::Value::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self(serde_json::Value::from(b))
    }
}

/// Rejects keys the engine cannot address.
pub(crate) fn validate_key(key: &str) -> CoreResult<()> {
    if key.is_empty() {
        return Err(CoreError::invalid_argument("key must not be empty"));
    }
    Ok(())
}
