//! CIBA grants and their status machine.
//!
//! ```text
//! authorization_pending ──authorize──▶ authorized
//!           │
//!           └───────────deny────────▶ access_denied
//! ```
//!
//! `authorized` and `access_denied` are terminal. A grant is an immutable
//! value: [`CibaGrant::update`] returns the next version, and the repository
//! persists it with a compare-and-set on the previous status.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::BackchannelAuthenticationRequestIdentifier;
use crate::AuthResult;
use crate::error::AuthError;
use crate::grant::AuthorizationGrant;
use crate::types::TenantIdentifier;

/// Opaque `auth_req_id` handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthReqId(String);

impl AuthReqId {
    /// 256 random bits, base64url encoded.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthReqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a CIBA grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CibaGrantStatus {
    AuthorizationPending,
    Authorized,
    AccessDenied,
}

impl CibaGrantStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationPending => "authorization_pending",
            Self::Authorized => "authorized",
            Self::AccessDenied => "access_denied",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AuthorizationPending)
    }

    /// Returns `true` if a grant may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: CibaGrantStatus) -> bool {
        matches!(
            (self, next),
            (Self::AuthorizationPending, Self::Authorized | Self::AccessDenied)
        )
    }
}

impl fmt::Display for CibaGrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The grant a client polls for with its `auth_req_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CibaGrant {
    pub tenant_id: TenantIdentifier,
    pub backchannel_request_id: BackchannelAuthenticationRequestIdentifier,
    pub auth_req_id: AuthReqId,
    pub grant: AuthorizationGrant,

    #[serde(with = "time::serde::rfc3339")]
    pub expired_at: OffsetDateTime,

    /// Minimum polling interval in seconds.
    pub interval: u64,

    pub status: CibaGrantStatus,
}

impl CibaGrant {
    /// Returns a copy of the grant with `status`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidTransition` unless the grant is pending
    /// and `status` is terminal.
    pub fn update(&self, status: CibaGrantStatus) -> AuthResult<CibaGrant> {
        if !self.status.can_transition_to(status) {
            return Err(AuthError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        Ok(Self {
            status,
            ..self.clone()
        })
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.grant.client_id
    }

    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expired_at
    }

    /// Seconds until expiry, zero once expired.
    #[must_use]
    pub fn expires_in(&self, now: OffsetDateTime) -> u64 {
        u64::try_from((self.expired_at - now).whole_seconds()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == CibaGrantStatus::AuthorizationPending
    }

    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.status == CibaGrantStatus::Authorized
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.status == CibaGrantStatus::AccessDenied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::AuthorizationGrantBuilder;
    use crate::testing::{CLIENT_ID, now, tenant};
    use crate::types::User;

    fn grant() -> CibaGrant {
        CibaGrant {
            tenant_id: tenant(),
            backchannel_request_id: BackchannelAuthenticationRequestIdentifier::generate(),
            auth_req_id: AuthReqId::generate(),
            grant: AuthorizationGrantBuilder::new(tenant(), User::new("alice"), CLIENT_ID).build(),
            expired_at: now() + time::Duration::seconds(120),
            interval: 5,
            status: CibaGrantStatus::AuthorizationPending,
        }
    }

    #[test]
    fn test_auth_req_id_is_256_bit_base64url() {
        let id = AuthReqId::generate();
        let decoded = URL_SAFE_NO_PAD.decode(id.as_str()).unwrap();
        assert_eq!(decoded.len(), 32);
        assert_ne!(id, AuthReqId::generate());
    }

    #[test]
    fn test_pending_to_terminal() {
        let pending = grant();

        let authorized = pending.update(CibaGrantStatus::Authorized).unwrap();
        assert!(authorized.is_authorized());
        assert_eq!(authorized.auth_req_id, pending.auth_req_id);
        // The original value is untouched.
        assert!(pending.is_pending());

        let denied = pending.update(CibaGrantStatus::AccessDenied).unwrap();
        assert!(denied.is_denied());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let authorized = grant().update(CibaGrantStatus::Authorized).unwrap();

        for next in [
            CibaGrantStatus::AuthorizationPending,
            CibaGrantStatus::Authorized,
            CibaGrantStatus::AccessDenied,
        ] {
            let err = authorized.update(next).unwrap_err();
            assert!(matches!(
                err,
                AuthError::InvalidTransition {
                    from: CibaGrantStatus::Authorized,
                    ..
                }
            ));
            assert!(err.is_server_error());
        }

        let denied = grant().update(CibaGrantStatus::AccessDenied).unwrap();
        assert!(denied.update(CibaGrantStatus::Authorized).is_err());
    }

    #[test]
    fn test_pending_to_pending_is_rejected() {
        assert!(grant().update(CibaGrantStatus::AuthorizationPending).is_err());
    }

    #[test]
    fn test_expiry() {
        let grant = grant();
        assert!(!grant.is_expired(now()));
        assert_eq!(grant.expires_in(now()), 120);
        assert!(grant.is_expired(now() + time::Duration::seconds(120)));
        assert_eq!(grant.expires_in(now() + time::Duration::seconds(121)), 0);
    }

    #[test]
    fn test_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&CibaGrantStatus::AuthorizationPending).unwrap(),
            "\"authorization_pending\""
        );
        assert_eq!(CibaGrantStatus::AccessDenied.to_string(), "access_denied");
    }
}
