//! CIBA request and grant storage.
//!
//! # Implementation Notes
//!
//! [`CibaGrantRepository::update`] is a compare-and-set: the stored grant is
//! replaced only while its status still equals `expected`. Without it a
//! poll that consumes a denial and a concurrent approval can both succeed,
//! or a grant can leave a terminal state.
//!
//! [`CibaGrantRepository::take`] is the matching compare-and-delete used to
//! redeem a decided grant. Only one of several concurrent polls receives
//! the grant.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::ciba::{
    AuthReqId, BackchannelAuthenticationRequest, BackchannelAuthenticationRequestIdentifier,
    CibaGrant, CibaGrantStatus,
};
use crate::types::TenantIdentifier;

/// Storage for CIBA grants, keyed by tenant and `auth_req_id`.
#[async_trait]
pub trait CibaGrantRepository: Send + Sync {
    /// Stores a new grant.
    async fn register(&self, grant: &CibaGrant) -> AuthResult<()>;

    /// Finds a grant by `auth_req_id`.
    async fn find(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
    ) -> AuthResult<Option<CibaGrant>>;

    /// Replaces the stored grant with `grant` if the stored status equals
    /// `expected`. Returns `false` if the status differs or the grant is
    /// gone.
    ///
    /// Must be atomic with respect to other `update` and `delete` calls for
    /// the same key.
    async fn update(&self, grant: &CibaGrant, expected: CibaGrantStatus) -> AuthResult<bool>;

    /// Removes and returns the grant if its status equals `expected`.
    ///
    /// Returns `None` if the grant is gone or has another status.
    ///
    /// # Atomicity
    ///
    /// Implementations must ensure that of several concurrent calls for the
    /// same key at most one returns the grant. With SQL this is a
    /// conditional delete:
    ///
    /// ```sql
    /// DELETE FROM ciba_grants
    /// WHERE tenant_id = $1 AND auth_req_id = $2 AND status = $3
    /// RETURNING *
    /// ```
    async fn take(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
        expected: CibaGrantStatus,
    ) -> AuthResult<Option<CibaGrant>>;

    /// Deletes a grant. Deleting a missing grant is not an error.
    async fn delete(&self, tenant: &TenantIdentifier, auth_req_id: &AuthReqId) -> AuthResult<()>;

    /// Deletes grants expired at `now`, whatever their status.
    ///
    /// Should be called periodically; polls never delete expired grants.
    ///
    /// # Returns
    ///
    /// Returns the number of grants deleted.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}

/// Storage for validated backchannel authentication requests.
#[async_trait]
pub trait BackchannelAuthenticationRequestRepository: Send + Sync {
    async fn register(&self, request: &BackchannelAuthenticationRequest) -> AuthResult<()>;

    async fn find(
        &self,
        tenant: &TenantIdentifier,
        id: &BackchannelAuthenticationRequestIdentifier,
    ) -> AuthResult<Option<BackchannelAuthenticationRequest>>;

    async fn delete(
        &self,
        tenant: &TenantIdentifier,
        id: &BackchannelAuthenticationRequestIdentifier,
    ) -> AuthResult<()>;

    /// Deletes requests whose grant expired at `now`.
    ///
    /// # Returns
    ///
    /// Returns the number of requests deleted.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
