//! Process-level configuration.
//!
//! Per-tenant settings live in [`crate::types::ServerConfiguration`] and
//! [`crate::types::ClientConfiguration`] and come from repositories. This
//! module holds the defaults and limits shared by every tenant, loaded once at
//! startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::TenantIdentifier;

/// Root configuration of the protocol core.
///
/// # Example (TOML)
///
/// ```toml
/// admin_tenant_id = "67e7eae6-62b0-4500-9eff-87459f63fc66"
///
/// [authorization]
/// request_expires_in = "30m"
///
/// [ciba]
/// default_expires_in = "5m"
/// default_interval = "5s"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Tenant that owns the control plane. Passed explicitly to whoever
    /// needs it instead of being looked up from a global.
    pub admin_tenant_id: Option<TenantIdentifier>,

    /// Front-channel authorization request settings.
    pub authorization: AuthorizationConfig,

    /// CIBA lifecycle defaults and limits.
    pub ciba: CibaConfig,

    /// `request_uri` fetching.
    pub request_uri: RequestUriConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_tenant_id: None,
            authorization: AuthorizationConfig::default(),
            ciba: CibaConfig::default(),
            request_uri: RequestUriConfig::default(),
        }
    }
}

/// Authorization request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Lifetime of a stored authorization request awaiting interaction.
    /// Used when the tenant does not configure its own.
    #[serde(with = "humantime_serde")]
    pub request_expires_in: Duration,

    /// Maximum lifetime (`exp - nbf`) and maximum `nbf` age of a FAPI
    /// request object.
    #[serde(with = "humantime_serde")]
    pub fapi_request_object_max_lifetime: Duration,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            request_expires_in: Duration::from_secs(1800), // 30 minutes
            fapi_request_object_max_lifetime: Duration::from_secs(3600), // 60 minutes
        }
    }
}

/// CIBA configuration.
///
/// The tenant's server configuration may override the defaults; the limits
/// always apply.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CibaConfig {
    /// `expires_in` when neither the request nor the tenant sets one.
    #[serde(with = "humantime_serde")]
    pub default_expires_in: Duration,

    /// Upper bound for `requested_expiry`.
    #[serde(with = "humantime_serde")]
    pub max_expires_in: Duration,

    /// Polling interval when the client does not negotiate one.
    #[serde(with = "humantime_serde")]
    pub default_interval: Duration,

    /// Shortest polling interval a client may negotiate.
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,

    /// Maximum `binding_message` length in characters.
    pub binding_message_max_length: usize,
}

impl Default for CibaConfig {
    fn default() -> Self {
        Self {
            default_expires_in: Duration::from_secs(300), // 5 minutes
            max_expires_in: Duration::from_secs(1800),    // 30 minutes
            default_interval: Duration::from_secs(5),
            min_interval: Duration::from_secs(5),
            binding_message_max_length: 128,
        }
    }
}

/// Configuration of the HTTP `request_uri` gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestUriConfig {
    /// HTTP request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Maximum response size in bytes.
    pub max_response_size: usize,

    /// Reject non-https `request_uri` values.
    pub require_https: bool,

    /// Hosts exempt from the private-address check, e.g. `localhost` in
    /// development. Compared case-insensitively against the URL host.
    pub bypass_hosts: Vec<String>,
}

impl Default for RequestUriConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_response_size: 64 * 1024,
            require_https: true,
            bypass_hosts: Vec::new(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl AuthConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and the errors of
    /// [`AuthConfig::validate`] otherwise.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns `true` if `tenant` is the configured admin tenant.
    #[must_use]
    pub fn is_admin_tenant(&self, tenant: &TenantIdentifier) -> bool {
        self.admin_tenant_id.as_ref() == Some(tenant)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - a lifetime or interval is zero
    /// - the CIBA default exceeds the maximum `expires_in`
    /// - the CIBA default interval is shorter than the minimum
    /// - the binding message or response size limit is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authorization.request_expires_in.is_zero() {
            return Err(ConfigError::InvalidValue(
                "authorization.request_expires_in must be > 0".to_string(),
            ));
        }

        if self.authorization.fapi_request_object_max_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "authorization.fapi_request_object_max_lifetime must be > 0".to_string(),
            ));
        }

        if self.ciba.default_expires_in.is_zero() {
            return Err(ConfigError::InvalidValue(
                "ciba.default_expires_in must be > 0".to_string(),
            ));
        }

        if self.ciba.default_expires_in > self.ciba.max_expires_in {
            return Err(ConfigError::InvalidValue(format!(
                "ciba.default_expires_in ({:?}) exceeds ciba.max_expires_in ({:?})",
                self.ciba.default_expires_in, self.ciba.max_expires_in
            )));
        }

        if self.ciba.min_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "ciba.min_interval must be > 0".to_string(),
            ));
        }

        if self.ciba.default_interval < self.ciba.min_interval {
            return Err(ConfigError::InvalidValue(
                "ciba.default_interval must be >= ciba.min_interval".to_string(),
            ));
        }

        if self.ciba.binding_message_max_length == 0 {
            return Err(ConfigError::InvalidValue(
                "ciba.binding_message_max_length must be > 0".to_string(),
            ));
        }

        if self.request_uri.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "request_uri.max_response_size must be > 0".to_string(),
            ));
        }

        if self.request_uri.bypass_hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "request_uri.bypass_hosts must not contain empty entries".to_string(),
            ));
        }

        Ok(())
    }
}
