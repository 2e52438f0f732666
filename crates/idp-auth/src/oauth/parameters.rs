//! Raw request parameters.
//!
//! Parameters arrive as `application/x-www-form-urlencoded` pairs and may
//! repeat. Repetition is kept so the pre-check can reject duplicates; the
//! getters return the first value.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::jose::JsonWebTokenClaims;

/// Parameters that may legitimately appear more than once (RFC 8707).
const MULTI_VALUED: &[&str] = &["resource"];

/// Prefix of deployment-specific parameters collected into
/// `custom_params`.
const CUSTOM_PARAMETER_PREFIX: &str = "custom_";

/// Multi-valued request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthRequestParameters {
    values: BTreeMap<String, Vec<String>>,
}

impl OAuthRequestParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from decoded key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut parameters = Self::new();
        for (key, value) in pairs {
            parameters.insert(key, value);
        }
        parameters
    }

    /// Parses a URL-encoded query string or form body. A leading `?` is
    /// ignored.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    /// Appends a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// First non-empty value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All values of `key` in arrival order.
    #[must_use]
    pub fn values(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Keys sent more than once, except the ones allowed to repeat.
    #[must_use]
    pub fn duplicate_keys(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|(key, values)| values.len() > 1 && !MULTI_VALUED.contains(&key.as_str()))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Parameters prefixed with `custom_`.
    #[must_use]
    pub fn custom_params(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .filter(|(key, _)| key.starts_with(CUSTOM_PARAMETER_PREFIX))
            .filter_map(|(key, values)| Some((key.clone(), values.first()?.clone())))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.get("client_id")
    }

    #[must_use]
    pub fn request(&self) -> Option<&str> {
        self.get("request")
    }

    #[must_use]
    pub fn request_uri(&self) -> Option<&str> {
        self.get("request_uri")
    }
}

/// Read access shared by query parameters and request object claims, so
/// context creation can merge the two uniformly.
pub trait ParameterSource {
    /// A value rendered as a string.
    fn string(&self, key: &str) -> Option<String>;

    /// A value as JSON. Query parameters carry JSON as text; text that does
    /// not parse is returned as a JSON string so verifiers can reject it.
    fn json(&self, key: &str) -> Option<Value>;

    /// Returns `true` if `key` is present.
    fn contains(&self, key: &str) -> bool {
        self.string(key).is_some()
    }
}

impl ParameterSource for OAuthRequestParameters {
    fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(ToString::to_string)
    }

    fn json(&self, key: &str) -> Option<Value> {
        let raw = self.get(key)?;
        Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
    }
}

impl ParameterSource for JsonWebTokenClaims {
    fn string(&self, key: &str) -> Option<String> {
        self.get_string(key).filter(|value| !value.is_empty())
    }

    fn json(&self, key: &str) -> Option<Value> {
        match self.get(key)? {
            Value::Null => None,
            Value::String(raw) => {
                Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())))
            }
            other => Some(other.clone()),
        }
    }
}
