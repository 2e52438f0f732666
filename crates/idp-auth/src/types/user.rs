//! End users that can be the subject of a grant.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identity provider used when a login hint does not name one.
pub const DEFAULT_PROVIDER_ID: &str = "idp-server";

/// A user account of a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Subject identifier (`sub`).
    pub sub: String,

    /// Identity provider the account belongs to.
    #[serde(default = "default_provider_id")]
    pub provider_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(default)]
    pub phone_number: Option<String>,

    #[serde(default)]
    pub phone_number_verified: bool,

    /// Extra claims released into tokens.
    #[serde(default)]
    pub custom_properties: HashMap<String, serde_json::Value>,
}

fn default_provider_id() -> String {
    DEFAULT_PROVIDER_ID.to_string()
}

impl User {
    /// Creates a user of the default provider.
    #[must_use]
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            provider_id: default_provider_id(),
            name: None,
            email: None,
            email_verified: false,
            phone_number: None,
            phone_number_verified: false,
            custom_properties: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }
}
