//! Tenant identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a tenant. Every configuration, request and grant is scoped
/// by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantIdentifier(String);

impl TenantIdentifier {
    /// Creates a tenant identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
