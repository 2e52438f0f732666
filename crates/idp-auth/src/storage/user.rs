//! User lookup for hint resolution.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{TenantIdentifier, User};

/// Read access to the users of a tenant.
///
/// Lookups return `Ok(None)` for unknown users; errors are reserved for
/// storage failures.
#[async_trait]
pub trait UserQueryRepository: Send + Sync {
    /// Finds a user by subject.
    async fn get(&self, tenant: &TenantIdentifier, sub: &str) -> AuthResult<Option<User>>;

    /// Finds a user by email address within an identity provider.
    async fn find_by_email(
        &self,
        tenant: &TenantIdentifier,
        email: &str,
        provider_id: &str,
    ) -> AuthResult<Option<User>>;

    /// Finds a user by phone number within an identity provider.
    async fn find_by_phone(
        &self,
        tenant: &TenantIdentifier,
        phone_number: &str,
        provider_id: &str,
    ) -> AuthResult<Option<User>>;
}
