//! Tenant and client configuration lookup.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{ClientConfiguration, ServerConfiguration, TenantIdentifier};

/// Server configuration of each tenant.
#[async_trait]
pub trait ServerConfigurationRepository: Send + Sync {
    /// Returns the server configuration of `tenant`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ServerConfigurationNotFound` if the tenant has
    /// none, or `AuthError::Storage` if the lookup fails.
    async fn get(&self, tenant: &TenantIdentifier) -> AuthResult<ServerConfiguration>;
}

/// Client registrations of each tenant.
#[async_trait]
pub trait ClientConfigurationRepository: Send + Sync {
    /// Returns the registration of `client_id` in `tenant`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClientConfigurationNotFound` if the client is not
    /// registered, or `AuthError::Storage` if the lookup fails.
    async fn get(&self, tenant: &TenantIdentifier, client_id: &str)
    -> AuthResult<ClientConfiguration>;
}
