//! Protocol error types.
//!
//! Every failure produced by request processing is an [`AuthError`]. The
//! variant decides how the error reaches the client:
//!
//! - [`AuthError::Redirectable`] is returned through the client's already
//!   validated `redirect_uri`
//! - [`AuthError::BadRequest`] is returned directly, because the redirect
//!   target is not trusted yet
//! - configuration lookups, storage and internal failures are translated at
//!   the boundary by [`crate::oauth::OAuthErrorResponse`]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ciba::CibaGrantStatus;
use crate::jose::JoseError;
use crate::oauth::ResponseMode;

// =============================================================================
// Error Codes
// =============================================================================

/// OAuth 2.0, OpenID Connect, JAR and CIBA error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthErrorCode {
    InvalidRequest,
    InvalidRequestObject,
    InvalidRequestUri,
    RequestNotSupported,
    RequestUriNotSupported,
    UnauthorizedClient,
    AccessDenied,
    UnsupportedResponseType,
    InvalidScope,
    ServerError,
    InvalidClient,
    InvalidGrant,
    LoginRequired,
    InteractionRequired,
    AuthorizationPending,
    SlowDown,
    ExpiredToken,
    UnknownUserId,
    InvalidBindingMessage,
    MissingUserCode,
}

impl OAuthErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidRequestObject => "invalid_request_object",
            Self::InvalidRequestUri => "invalid_request_uri",
            Self::RequestNotSupported => "request_not_supported",
            Self::RequestUriNotSupported => "request_uri_not_supported",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::LoginRequired => "login_required",
            Self::InteractionRequired => "interaction_required",
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::ExpiredToken => "expired_token",
            Self::UnknownUserId => "unknown_user_id",
            Self::InvalidBindingMessage => "invalid_binding_message",
            Self::MissingUserCode => "missing_user_code",
        }
    }
}

impl fmt::Display for OAuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a redirectable error is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectTarget {
    /// The validated redirect URI.
    pub redirect_uri: String,
    /// `state` echoed back to the client.
    pub state: Option<String>,
    /// Response mode used to encode the error parameters.
    pub response_mode: ResponseMode,
    /// Issuer identifier, sent as `iss` (RFC 9207).
    pub issuer: String,
}

// =============================================================================
// Auth Error
// =============================================================================

/// Errors that can occur while processing authorization and backchannel
/// authentication requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A bad request that must not be redirected to the client.
    #[error("{code}: {message}")]
    BadRequest {
        /// OAuth error code.
        code: OAuthErrorCode,
        /// Human readable description.
        message: String,
    },

    /// A bad request delivered through the client's redirect URI.
    #[error("{code}: {message}")]
    Redirectable {
        /// OAuth error code.
        code: OAuthErrorCode,
        /// Human readable description.
        message: String,
        /// Redirect target of the error response.
        target: Box<RedirectTarget>,
    },

    /// The client is unknown or failed a client-level requirement.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The grant is unknown, belongs to another client or was consumed.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// No server configuration is registered for the tenant.
    #[error("Server configuration not found: {tenant_id}")]
    ServerConfigurationNotFound {
        /// Tenant that was looked up.
        tenant_id: String,
    },

    /// No client configuration is registered for the client id.
    #[error("Client configuration not found: {client_id}")]
    ClientConfigurationNotFound {
        /// Client that was looked up.
        client_id: String,
    },

    /// A request object or token could not be parsed, decrypted or verified.
    #[error("Invalid JOSE: {0}")]
    Jose(#[from] JoseError),

    /// A CIBA grant was asked to leave a terminal state.
    #[error("Invalid CIBA grant transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: CibaGrantStatus,
        /// Requested status.
        to: CibaGrantStatus,
    },

    /// An error occurred while storing or retrieving data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a non-redirectable `BadRequest` error.
    #[must_use]
    pub fn bad_request(code: OAuthErrorCode, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    /// Creates a non-redirectable `invalid_request` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::bad_request(OAuthErrorCode::InvalidRequest, message)
    }

    /// Creates a `Redirectable` error.
    #[must_use]
    pub fn redirectable(
        code: OAuthErrorCode,
        message: impl Into<String>,
        target: RedirectTarget,
    ) -> Self {
        Self::Redirectable {
            code,
            message: message.into(),
            target: Box::new(target),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the redirect target if the error is delivered by redirect.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&RedirectTarget> {
        match self {
            Self::Redirectable { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Returns `true` if the error is delivered through the redirect URI.
    #[must_use]
    pub fn is_redirectable(&self) -> bool {
        matches!(self, Self::Redirectable { .. })
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest { .. }
                | Self::Redirectable { .. }
                | Self::InvalidClient { .. }
                | Self::InvalidGrant { .. }
                | Self::ServerConfigurationNotFound { .. }
                | Self::ClientConfigurationNotFound { .. }
                | Self::Jose(_)
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BadRequest { .. } | Self::Redirectable { .. } => ErrorCategory::Validation,
            Self::InvalidClient { .. } => ErrorCategory::Authentication,
            Self::InvalidGrant { .. } => ErrorCategory::Grant,
            Self::ServerConfigurationNotFound { .. } | Self::ClientConfigurationNotFound { .. } => {
                ErrorCategory::Configuration
            }
            Self::Jose(_) => ErrorCategory::Jose,
            Self::InvalidTransition { .. } | Self::Internal { .. } => ErrorCategory::Internal,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> OAuthErrorCode {
        match self {
            Self::BadRequest { code, .. } | Self::Redirectable { code, .. } => *code,
            Self::InvalidClient { .. } => OAuthErrorCode::InvalidClient,
            Self::InvalidGrant { .. } => OAuthErrorCode::InvalidGrant,
            Self::ServerConfigurationNotFound { .. } => OAuthErrorCode::InvalidRequest,
            Self::ClientConfigurationNotFound { .. } => OAuthErrorCode::InvalidClient,
            Self::Jose(_) => OAuthErrorCode::InvalidRequestObject,
            Self::InvalidTransition { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => OAuthErrorCode::ServerError,
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Client authentication errors.
    Authentication,
    /// Grant lookup and lifecycle errors.
    Grant,
    /// JOSE parsing, decryption and signature errors.
    Jose,
    /// Missing or invalid configuration.
    Configuration,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Grant => write!(f, "grant"),
            Self::Jose => write!(f, "jose"),
            Self::Configuration => write!(f, "configuration"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RedirectTarget {
        RedirectTarget {
            redirect_uri: "https://client.example.com/cb".to_string(),
            state: Some("xyz".to_string()),
            response_mode: ResponseMode::Query,
            issuer: "https://idp.example.com".to_string(),
        }
    }

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_request("missing client_id");
        assert_eq!(err.to_string(), "invalid_request: missing client_id");

        let err = AuthError::invalid_client("client not found");
        assert_eq!(err.to_string(), "Invalid client: client not found");

        let err = AuthError::InvalidTransition {
            from: CibaGrantStatus::Authorized,
            to: CibaGrantStatus::AccessDenied,
        };
        assert_eq!(
            err.to_string(),
            "Invalid CIBA grant transition: authorized -> access_denied"
        );
    }

    #[test]
    fn test_redirectable_carries_target() {
        let err = AuthError::redirectable(OAuthErrorCode::InvalidScope, "no scope", target());
        assert!(err.is_redirectable());
        assert_eq!(
            err.redirect_target().map(|t| t.state.as_deref()),
            Some(Some("xyz"))
        );
        assert!(!AuthError::invalid_request("x").is_redirectable());
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::invalid_client("test").is_client_error());
        assert!(!AuthError::invalid_client("test").is_server_error());
        assert!(AuthError::storage("database down").is_server_error());
        assert!(AuthError::from(JoseError::malformed("bad")).is_client_error());
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::ServerConfigurationNotFound {
                tenant_id: "t".into()
            }
            .oauth_error_code(),
            OAuthErrorCode::InvalidRequest
        );
        assert_eq!(
            AuthError::ClientConfigurationNotFound {
                client_id: "c".into()
            }
            .oauth_error_code(),
            OAuthErrorCode::InvalidClient
        );
        assert_eq!(
            AuthError::from(JoseError::malformed("bad")).oauth_error_code(),
            OAuthErrorCode::InvalidRequestObject
        );
        assert_eq!(
            AuthError::internal("boom").oauth_error_code(),
            OAuthErrorCode::ServerError
        );
    }

    #[test]
    fn test_error_code_serde() {
        let json = serde_json::to_string(&OAuthErrorCode::AuthorizationPending).unwrap();
        assert_eq!(json, "\"authorization_pending\"");
        assert_eq!(OAuthErrorCode::ExpiredToken.to_string(), "expired_token");
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(
            AuthError::invalid_grant("x").category(),
            ErrorCategory::Grant
        );
    }
}
