//! JWT claims set accessors.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::JoseError;

/// Audience claim can be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrArray {
    /// Single string audience.
    String(String),
    /// Array of audience strings.
    Array(Vec<String>),
}

impl StringOrArray {
    /// Checks if the audience contains the specified value.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::String(s) => s == value,
            Self::Array(arr) => arr.iter().any(|s| s == value),
        }
    }

    /// Returns all values.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::String(s) => vec![s.as_str()],
            Self::Array(arr) => arr.iter().map(String::as_str).collect(),
        }
    }
}

/// The claims set of a verified token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonWebTokenClaims(Map<String, Value>);

impl JsonWebTokenClaims {
    /// Wraps a JSON object.
    #[must_use]
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Decodes a base64url payload segment.
    ///
    /// # Errors
    ///
    /// Returns `JoseError::Malformed` if the segment is not base64url encoded
    /// JSON object.
    pub fn decode(segment: &str) -> Result<Self, JoseError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| JoseError::malformed("invalid payload encoding"))?;
        Self::from_value(
            serde_json::from_slice(&bytes)
                .map_err(|e| JoseError::malformed(format!("invalid payload JSON: {e}")))?,
        )
    }

    /// Converts a JSON value, rejecting anything but an object.
    ///
    /// # Errors
    ///
    /// Returns `JoseError::Malformed` if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self, JoseError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(JoseError::malformed("payload is not a JSON object")),
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a claim rendered as a string. Numbers and booleans are
    /// stringified; objects and arrays are returned as JSON text.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.0.get("iss").and_then(Value::as_str)
    }

    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    #[must_use]
    pub fn jti(&self) -> Option<&str> {
        self.0.get("jti").and_then(Value::as_str)
    }

    /// The `aud` claim, absent when missing or not a string / string array.
    #[must_use]
    pub fn aud(&self) -> Option<StringOrArray> {
        self.0
            .get("aud")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.numeric_date("exp")
    }

    #[must_use]
    pub fn nbf(&self) -> Option<i64> {
        self.numeric_date("nbf")
    }

    #[must_use]
    pub fn iat(&self) -> Option<i64> {
        self.numeric_date("iat")
    }

    /// NumericDate claims may be integers or floats (RFC 7519 section 2).
    fn numeric_date(&self, key: &str) -> Option<i64> {
        let value = self.0.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}
