//! Authorization request storage.
//!
//! A validated request is stored while the user authenticates and consents,
//! then looked up by its identifier when the interaction completes.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::{AuthorizationRequest, AuthorizationRequestIdentifier};
use crate::types::TenantIdentifier;

/// Storage for [`AuthorizationRequest`] records.
///
/// Records are written once and never updated in place.
#[async_trait]
pub trait AuthorizationRequestRepository: Send + Sync {
    /// Stores a new request.
    async fn register(&self, request: &AuthorizationRequest) -> AuthResult<()>;

    /// Finds a request by identifier.
    async fn find(
        &self,
        tenant: &TenantIdentifier,
        id: &AuthorizationRequestIdentifier,
    ) -> AuthResult<Option<AuthorizationRequest>>;

    /// Returns a request that must exist.
    ///
    /// # Errors
    ///
    /// Returns a non-redirectable `invalid_request` if the request is
    /// unknown.
    async fn get(
        &self,
        tenant: &TenantIdentifier,
        id: &AuthorizationRequestIdentifier,
    ) -> AuthResult<AuthorizationRequest> {
        self.find(tenant, id)
            .await?
            .ok_or_else(|| AuthError::invalid_request(format!("authorization request {id} not found")))
    }

    /// Deletes a request. Deleting a missing request is not an error.
    async fn delete(
        &self,
        tenant: &TenantIdentifier,
        id: &AuthorizationRequestIdentifier,
    ) -> AuthResult<()>;

    /// Deletes requests abandoned before their `expires_at`.
    ///
    /// Should be called periodically to keep storage from growing.
    ///
    /// # Returns
    ///
    /// Returns the number of requests deleted.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
