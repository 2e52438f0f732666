//! The validated backchannel authentication request.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::hint::{UserHint, UserHintType};
use crate::oauth::OAuthRequestPattern;
use crate::types::{Scopes, ServerConfiguration, TenantIdentifier};

/// Identifier of a stored backchannel authentication request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackchannelAuthenticationRequestIdentifier(Uuid);

impl BackchannelAuthenticationRequestIdentifier {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for BackchannelAuthenticationRequestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Rule set of a backchannel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CibaProfile {
    Ciba,
    /// FAPI: Client Initiated Backchannel Authentication Profile.
    FapiCiba,
}

impl CibaProfile {
    /// `FapiCiba` when a FAPI Advanced scope is requested.
    #[must_use]
    pub fn resolve(scopes: &Scopes, server: &ServerConfiguration) -> Self {
        if server.has_fapi_advanced_scope(scopes) {
            Self::FapiCiba
        } else {
            Self::Ciba
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ciba => "CIBA",
            Self::FapiCiba => "FAPI_CIBA",
        }
    }
}

impl fmt::Display for CibaProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backchannel authentication request after parameter merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackchannelAuthenticationRequest {
    pub identifier: BackchannelAuthenticationRequestIdentifier,
    pub tenant_id: TenantIdentifier,
    pub profile: CibaProfile,
    pub pattern: OAuthRequestPattern,
    pub client_id: String,
    pub scopes: Scopes,
    pub client_notification_token: Option<String>,
    pub acr_values: Option<String>,
    pub login_hint: Option<String>,
    pub login_hint_token: Option<String>,
    pub id_token_hint: Option<String>,
    pub binding_message: Option<String>,
    pub user_code: Option<String>,

    /// Raw `requested_expiry`; see [`Self::requested_expiry_seconds`].
    pub requested_expiry: Option<String>,

    /// Raw `authorization_details` JSON.
    pub authorization_details: Option<Value>,

    /// The `request` object, for REQUEST_OBJECT requests.
    pub request: Option<String>,

    /// `custom_*` parameters.
    #[serde(default)]
    pub custom_params: BTreeMap<String, String>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Expiry of the grant created for this request. Unset until the grant
    /// exists.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl BackchannelAuthenticationRequest {
    /// Number of hint parameters present.
    #[must_use]
    pub fn hint_count(&self) -> usize {
        [&self.login_hint, &self.id_token_hint, &self.login_hint_token]
            .into_iter()
            .filter(|hint| hint.is_some())
            .count()
    }

    /// The hint naming the user. `id_token_hint` wins over `login_hint`,
    /// which wins over `login_hint_token`.
    #[must_use]
    pub fn user_hint(&self) -> Option<UserHint> {
        if let Some(hint) = &self.id_token_hint {
            return Some(UserHint::new(UserHintType::IdTokenHint, hint));
        }
        if let Some(hint) = &self.login_hint {
            return Some(UserHint::new(UserHintType::LoginHint, hint));
        }
        self.login_hint_token
            .as_ref()
            .map(|hint| UserHint::new(UserHintType::LoginHintToken, hint))
    }

    /// `requested_expiry` as a positive number of seconds.
    #[must_use]
    pub fn requested_expiry_seconds(&self) -> Option<u64> {
        self.requested_expiry
            .as_deref()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|seconds| *seconds > 0)
    }

    #[must_use]
    pub fn has_authorization_details(&self) -> bool {
        self.authorization_details.is_some()
    }

    /// Returns `true` once `expires_at` is set and reached.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}
