//! Per-tenant authorization server configuration.
//!
//! Field names follow the OpenID Provider / OAuth 2.0 Authorization Server
//! metadata registries, so a discovery document can be deserialized directly.

use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};

use crate::oauth::AuthorizationProfile;
use crate::types::{Scopes, TenantIdentifier};

fn empty_jwks() -> JwkSet {
    JwkSet { keys: Vec::new() }
}

fn all_profiles() -> Vec<AuthorizationProfile> {
    vec![
        AuthorizationProfile::OAuth2,
        AuthorizationProfile::Oidc,
        AuthorizationProfile::FapiBaseline,
        AuthorizationProfile::FapiAdvanced,
        AuthorizationProfile::Ciba,
    ]
}

/// Authorization server configuration of one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfiguration {
    /// Owning tenant.
    pub tenant_id: TenantIdentifier,

    /// Issuer identifier (`iss` of tokens, expected `aud` of request objects).
    pub issuer: String,

    /// Public keys of the server.
    #[serde(default = "empty_jwks")]
    pub jwks: JwkSet,

    /// PEM encoded RSA private key used to decrypt `RSA-OAEP-256` request
    /// objects.
    #[serde(default, skip_serializing)]
    pub decryption_key_pem: Option<String>,

    #[serde(default)]
    pub scopes_supported: Vec<String>,

    #[serde(default)]
    pub response_types_supported: Vec<String>,

    #[serde(default)]
    pub response_modes_supported: Vec<String>,

    #[serde(default)]
    pub grant_types_supported: Vec<String>,

    #[serde(default)]
    pub request_object_signing_alg_values_supported: Vec<String>,

    /// Only request object values are used when set; query parameters are
    /// ignored.
    #[serde(default)]
    pub require_signed_request_object: bool,

    #[serde(default)]
    pub authorization_details_types_supported: Vec<String>,

    #[serde(default)]
    pub tls_client_certificate_bound_access_tokens: bool,

    #[serde(default)]
    pub backchannel_token_delivery_modes_supported: Vec<String>,

    #[serde(default)]
    pub backchannel_user_code_parameter_supported: bool,

    /// Scopes that switch a request to the FAPI Baseline profile.
    #[serde(default)]
    pub fapi_baseline_scopes: Vec<String>,

    /// Scopes that switch a request to the FAPI Advanced (and FAPI-CIBA)
    /// profile.
    #[serde(default)]
    pub fapi_advanced_scopes: Vec<String>,

    /// Profiles this tenant accepts.
    #[serde(default = "all_profiles")]
    pub profiles_supported: Vec<AuthorizationProfile>,

    /// Applied when the request carries no `max_age`.
    #[serde(default)]
    pub default_max_age: Option<u64>,

    /// Lifetime of stored authorization requests, in seconds.
    #[serde(default)]
    pub authorization_request_expires_in: Option<u64>,

    /// Default CIBA `expires_in`, in seconds.
    #[serde(default)]
    pub backchannel_authentication_request_expires_in: Option<u64>,

    /// Default CIBA polling interval, in seconds.
    #[serde(default)]
    pub backchannel_authentication_polling_interval: Option<u64>,
}

impl ServerConfiguration {
    /// Creates a configuration with the given issuer and empty metadata.
    #[must_use]
    pub fn new(tenant_id: TenantIdentifier, issuer: impl Into<String>) -> Self {
        Self {
            tenant_id,
            issuer: issuer.into(),
            jwks: empty_jwks(),
            decryption_key_pem: None,
            scopes_supported: Vec::new(),
            response_types_supported: Vec::new(),
            response_modes_supported: Vec::new(),
            grant_types_supported: Vec::new(),
            request_object_signing_alg_values_supported: Vec::new(),
            require_signed_request_object: false,
            authorization_details_types_supported: Vec::new(),
            tls_client_certificate_bound_access_tokens: false,
            backchannel_token_delivery_modes_supported: Vec::new(),
            backchannel_user_code_parameter_supported: false,
            fapi_baseline_scopes: Vec::new(),
            fapi_advanced_scopes: Vec::new(),
            profiles_supported: all_profiles(),
            default_max_age: None,
            authorization_request_expires_in: None,
            backchannel_authentication_request_expires_in: None,
            backchannel_authentication_polling_interval: None,
        }
    }

    /// Returns `true` if `response_type` is advertised. Values are compared
    /// as unordered sets (`id_token code` equals `code id_token`).
    #[must_use]
    pub fn is_supported_response_type(&self, response_type: &str) -> bool {
        let wanted = normalize_space_set(response_type);
        self.response_types_supported
            .iter()
            .any(|supported| normalize_space_set(supported) == wanted)
    }

    #[must_use]
    pub fn is_supported_response_mode(&self, response_mode: &str) -> bool {
        self.response_modes_supported
            .iter()
            .any(|m| m == response_mode)
    }

    #[must_use]
    pub fn is_supported_grant_type(&self, grant_type: &str) -> bool {
        self.grant_types_supported.iter().any(|g| g == grant_type)
    }

    #[must_use]
    pub fn is_supported_scope(&self, scope: &str) -> bool {
        self.scopes_supported.iter().any(|s| s == scope)
    }

    /// Returns `true` if the request object signing algorithm is accepted.
    /// `none` is only accepted when explicitly listed.
    #[must_use]
    pub fn is_supported_request_object_alg(&self, alg: &str) -> bool {
        self.request_object_signing_alg_values_supported
            .iter()
            .any(|a| a == alg)
    }

    #[must_use]
    pub fn is_supported_authorization_details_type(&self, detail_type: &str) -> bool {
        self.authorization_details_types_supported
            .iter()
            .any(|t| t == detail_type)
    }

    #[must_use]
    pub fn is_supported_delivery_mode(&self, mode: &str) -> bool {
        self.backchannel_token_delivery_modes_supported
            .iter()
            .any(|m| m == mode)
    }

    #[must_use]
    pub fn supports_profile(&self, profile: AuthorizationProfile) -> bool {
        self.profiles_supported.contains(&profile)
    }

    #[must_use]
    pub fn has_fapi_baseline_scope(&self, scopes: &Scopes) -> bool {
        scopes.contains_any(&self.fapi_baseline_scopes)
    }

    #[must_use]
    pub fn has_fapi_advanced_scope(&self, scopes: &Scopes) -> bool {
        scopes.contains_any(&self.fapi_advanced_scopes)
    }

    /// Returns `true` if the server JWKS holds a key for `alg`.
    #[must_use]
    pub fn has_key_for_algorithm(&self, alg: &str) -> bool {
        self.jwks.keys.iter().any(|key| {
            key.common
                .key_algorithm
                .as_ref()
                .is_some_and(|key_alg| key_alg.to_string() == alg)
        })
    }
}

/// Sorts the space separated tokens of a multi-valued parameter.
pub(crate) fn normalize_space_set(value: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = value.split_whitespace().collect();
    parts.sort_unstable();
    parts.dedup();
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_type_order_insensitive() {
        let mut server = ServerConfiguration::new("t".into(), "https://idp.example.com");
        server.response_types_supported = vec!["code".into(), "code id_token".into()];
        assert!(server.is_supported_response_type("id_token code"));
        assert!(server.is_supported_response_type("code"));
        assert!(!server.is_supported_response_type("token"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let server: ServerConfiguration = serde_json::from_value(serde_json::json!({
            "tenant_id": "tenant-a",
            "issuer": "https://idp.example.com/tenant-a",
        }))
        .unwrap();
        assert!(server.jwks.keys.is_empty());
        assert!(server.supports_profile(AuthorizationProfile::FapiAdvanced));
        assert!(!server.require_signed_request_object);
    }

    #[test]
    fn test_fapi_scopes() {
        let mut server = ServerConfiguration::new("t".into(), "https://idp.example.com");
        server.fapi_advanced_scopes = vec!["transfers".into()];
        assert!(server.has_fapi_advanced_scope(&Scopes::parse("openid transfers")));
        assert!(!server.has_fapi_baseline_scope(&Scopes::parse("openid transfers")));
    }
}
