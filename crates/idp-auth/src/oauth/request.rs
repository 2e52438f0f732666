//! The validated, persisted authorization request.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{AuthorizationProfile, OAuthRequestPattern, Prompt, ResponseMode, ResponseType};
use crate::types::{Scopes, TenantIdentifier};

/// Identifier of a stored authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationRequestIdentifier(Uuid);

impl AuthorizationRequestIdentifier {
    /// Generates a random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AuthorizationRequestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An authorization request after parameter merging.
///
/// Created once by the context creators and never mutated. Raw string
/// values are kept as received; the typed accessors return `None` for
/// unknown values, which the verifiers reject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub identifier: AuthorizationRequestIdentifier,
    pub tenant_id: TenantIdentifier,
    pub profile: AuthorizationProfile,
    pub pattern: OAuthRequestPattern,
    pub client_id: String,

    pub response_type: Option<String>,
    pub redirect_uri: Option<String>,

    /// Requested scopes after filtering by server and client.
    pub scopes: Scopes,

    pub state: Option<String>,
    pub nonce: Option<String>,
    pub response_mode: Option<String>,
    pub display: Option<String>,

    /// Raw space-delimited `prompt`.
    pub prompt: Option<String>,

    /// `max_age` in seconds as sent, or the server default.
    pub max_age: Option<String>,

    pub ui_locales: Option<String>,
    pub acr_values: Option<String>,
    pub login_hint: Option<String>,
    pub id_token_hint: Option<String>,

    /// OIDC `claims` request.
    pub claims: Option<Value>,

    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,

    pub authorization_details: Option<Value>,
    pub presentation_definition: Option<Value>,
    pub presentation_definition_uri: Option<String>,

    /// The `request` JWT, for REQUEST_OBJECT requests.
    pub request: Option<String>,
    pub request_uri: Option<String>,

    #[serde(default)]
    pub custom_params: BTreeMap<String, String>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationRequest {
    /// Parsed `response_type`.
    #[must_use]
    pub fn response_type(&self) -> Option<ResponseType> {
        self.response_type.as_deref().and_then(ResponseType::parse)
    }

    /// Parsed `response_mode`.
    #[must_use]
    pub fn response_mode(&self) -> Option<ResponseMode> {
        self.response_mode.as_deref().and_then(ResponseMode::parse)
    }

    /// `prompt` members; unknown members are `None`.
    #[must_use]
    pub fn prompts(&self) -> Vec<Option<Prompt>> {
        self.prompt
            .as_deref()
            .map(|p| p.split_whitespace().map(Prompt::parse).collect())
            .unwrap_or_default()
    }

    /// `max_age` as seconds, if it is a non-negative integer.
    #[must_use]
    pub fn max_age_seconds(&self) -> Option<u64> {
        self.max_age.as_deref().and_then(|v| v.parse().ok())
    }

    #[must_use]
    pub fn has_pkce(&self) -> bool {
        self.code_challenge.is_some()
    }

    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}
