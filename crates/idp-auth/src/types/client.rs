//! OAuth 2.0 client registration.
//!
//! Field names follow RFC 7591 / OpenID Connect Dynamic Client Registration
//! metadata.

use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};

use crate::types::Scopes;
use crate::types::server::normalize_space_set;

// =============================================================================
// Grant Type
// =============================================================================

/// Grant types a client may be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    #[serde(rename = "implicit")]
    Implicit,
    #[serde(rename = "refresh_token")]
    RefreshToken,
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    /// Client Initiated Backchannel Authentication.
    #[serde(rename = "urn:openid:params:grant-type:ciba")]
    Ciba,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Implicit => "implicit",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
            Self::Ciba => "urn:openid:params:grant-type:ciba",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client Authentication
// =============================================================================

/// `token_endpoint_auth_method` of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthenticationType {
    #[default]
    ClientSecretBasic,
    ClientSecretPost,
    ClientSecretJwt,
    PrivateKeyJwt,
    TlsClientAuth,
    SelfSignedTlsClientAuth,
    /// Public client.
    None,
}

impl ClientAuthenticationType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
            Self::ClientSecretJwt => "client_secret_jwt",
            Self::PrivateKeyJwt => "private_key_jwt",
            Self::TlsClientAuth => "tls_client_auth",
            Self::SelfSignedTlsClientAuth => "self_signed_tls_client_auth",
            Self::None => "none",
        }
    }

    /// Returns `true` for `private_key_jwt` and the mutual TLS methods.
    #[must_use]
    pub fn is_asymmetric_or_mtls(&self) -> bool {
        matches!(
            self,
            Self::PrivateKeyJwt | Self::TlsClientAuth | Self::SelfSignedTlsClientAuth
        )
    }
}

impl std::fmt::Display for ClientAuthenticationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// A client registered with a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfiguration {
    pub client_id: String,

    /// Alternative identifier accepted as request object `iss`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id_alias: Option<String>,

    /// Shared secret. Verifies `HS*` request objects and derives the `dir`
    /// JWE key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub client_name: Option<String>,

    #[serde(default)]
    pub redirect_uris: Vec<String>,

    #[serde(default)]
    pub response_types: Vec<String>,

    #[serde(default)]
    pub grant_types: Vec<GrantType>,

    /// Space-delimited scopes the client may request.
    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub token_endpoint_auth_method: ClientAuthenticationType,

    /// Inline public keys of the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks: Option<JwkSet>,

    #[serde(default)]
    pub tls_client_certificate_bound_access_tokens: bool,

    /// JARM signing algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_signed_response_alg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backchannel_token_delivery_mode: Option<String>,

    #[serde(default)]
    pub backchannel_user_code_parameter: bool,

    /// Preferred CIBA polling interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backchannel_polling_interval: Option<u64>,

    #[serde(default)]
    pub authorization_details_types: Vec<String>,
}

impl ClientConfiguration {
    /// Creates a confidential client with no registered metadata.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_id_alias: None,
            client_secret: None,
            client_name: None,
            redirect_uris: Vec::new(),
            response_types: Vec::new(),
            grant_types: Vec::new(),
            scope: String::new(),
            token_endpoint_auth_method: ClientAuthenticationType::default(),
            jwks: None,
            tls_client_certificate_bound_access_tokens: false,
            authorization_signed_response_alg: None,
            backchannel_token_delivery_mode: None,
            backchannel_user_code_parameter: false,
            backchannel_polling_interval: None,
            authorization_details_types: Vec::new(),
        }
    }

    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client id is empty
    /// - A client authenticating with a shared secret has none
    /// - The authorization code or implicit grant is registered without
    ///   redirect URIs
    /// - A redirect URI carries a fragment
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if matches!(
            self.token_endpoint_auth_method,
            ClientAuthenticationType::ClientSecretBasic
                | ClientAuthenticationType::ClientSecretPost
                | ClientAuthenticationType::ClientSecretJwt
        ) && self.client_secret.is_none()
        {
            return Err(ClientValidationError::MissingSecret);
        }

        if (self.grant_types.contains(&GrantType::AuthorizationCode)
            || self.grant_types.contains(&GrantType::Implicit))
            && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        if let Some(uri) = self.redirect_uris.iter().find(|uri| uri.contains('#')) {
            return Err(ClientValidationError::RedirectUriWithFragment(uri.clone()));
        }

        Ok(())
    }

    /// Returns `true` if `id` is the client id or its alias.
    #[must_use]
    pub fn is_client_id_or_alias(&self, id: &str) -> bool {
        self.client_id == id || self.client_id_alias.as_deref() == Some(id)
    }

    /// Exact string match against the registered redirect URIs.
    #[must_use]
    pub fn is_registered_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }

    /// The registered redirect URI when exactly one is registered.
    #[must_use]
    pub fn single_redirect_uri(&self) -> Option<&str> {
        match self.redirect_uris.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Returns `true` if `response_type` is registered (order-insensitive).
    #[must_use]
    pub fn is_registered_response_type(&self, response_type: &str) -> bool {
        let wanted = normalize_space_set(response_type);
        self.response_types
            .iter()
            .any(|registered| normalize_space_set(registered) == wanted)
    }

    #[must_use]
    pub fn is_registered_grant_type(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Scopes the client is registered for.
    #[must_use]
    pub fn scopes(&self) -> Scopes {
        Scopes::parse(&self.scope)
    }

    /// Public clients authenticate with `none`.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.token_endpoint_auth_method == ClientAuthenticationType::None
    }

    #[must_use]
    pub fn is_push_delivery_mode(&self) -> bool {
        self.backchannel_token_delivery_mode.as_deref() == Some("push")
    }
}

/// Client registration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Authorization code and implicit flows require redirect URIs.
    #[error("Authorization code flow requires redirect URIs")]
    NoRedirectUris,

    /// Secret based authentication requires a client secret.
    #[error("Secret based client authentication requires a client secret")]
    MissingSecret,

    /// Redirect URIs must not contain a fragment.
    #[error("Redirect URI must not contain a fragment: {0}")]
    RedirectUriWithFragment(String),
}
