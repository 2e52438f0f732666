//! Authorization profiles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Scopes, ServerConfiguration};

/// The rule set a request is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationProfile {
    #[serde(rename = "OAUTH2")]
    OAuth2,
    #[serde(rename = "OIDC")]
    Oidc,
    #[serde(rename = "FAPI_BASELINE")]
    FapiBaseline,
    #[serde(rename = "FAPI_ADVANCED")]
    FapiAdvanced,
    #[serde(rename = "CIBA")]
    Ciba,
    #[serde(rename = "UNDEFINED")]
    Undefined,
}

impl AuthorizationProfile {
    /// Resolves the profile of a front-channel request from its scopes.
    ///
    /// | scope contains | profile |
    /// |---|---|
    /// | a FAPI Advanced scope | `FapiAdvanced` |
    /// | a FAPI Baseline scope | `FapiBaseline` |
    /// | `openid` | `Oidc` |
    /// | otherwise | `OAuth2` |
    #[must_use]
    pub fn resolve(scopes: &Scopes, server: &ServerConfiguration) -> Self {
        if server.has_fapi_advanced_scope(scopes) {
            Self::FapiAdvanced
        } else if server.has_fapi_baseline_scope(scopes) {
            Self::FapiBaseline
        } else if scopes.has_openid() {
            Self::Oidc
        } else {
            Self::OAuth2
        }
    }

    #[must_use]
    pub fn is_fapi(&self) -> bool {
        matches!(self, Self::FapiBaseline | Self::FapiAdvanced)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth2 => "OAUTH2",
            Self::Oidc => "OIDC",
            Self::FapiBaseline => "FAPI_BASELINE",
            Self::FapiAdvanced => "FAPI_ADVANCED",
            Self::Ciba => "CIBA",
            Self::Undefined => "UNDEFINED",
        }
    }
}

impl fmt::Display for AuthorizationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
