//! Creation of pending CIBA grants.

use time::OffsetDateTime;

use super::{AuthReqId, BackchannelAuthenticationRequest, CibaGrant, CibaGrantStatus};
use crate::AuthResult;
use crate::config::CibaConfig;
use crate::grant::AuthorizationGrantBuilder;
use crate::oauth::AuthorizationDetails;
use crate::oauth::creator::expires_at;
use crate::types::{ClientConfiguration, GrantType, ServerConfiguration, User};

/// Negotiated `expires_in` and polling `interval`, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CibaGrantPolicy {
    pub default_expires_in: u64,
    pub max_expires_in: u64,
    pub default_interval: u64,
    pub min_interval: u64,
}

impl CibaGrantPolicy {
    /// Process limits from `config`, defaults overridden by the tenant.
    #[must_use]
    pub fn new(config: &CibaConfig, server: &ServerConfiguration) -> Self {
        let max_expires_in = config.max_expires_in.as_secs();
        let min_interval = config.min_interval.as_secs();
        Self {
            default_expires_in: server
                .backchannel_authentication_request_expires_in
                .unwrap_or_else(|| config.default_expires_in.as_secs())
                .min(max_expires_in),
            max_expires_in,
            default_interval: server
                .backchannel_authentication_polling_interval
                .unwrap_or_else(|| config.default_interval.as_secs())
                .max(min_interval),
            min_interval,
        }
    }

    /// `requested_expiry` capped at the maximum, else the default.
    #[must_use]
    pub fn expires_in(&self, requested: Option<u64>) -> u64 {
        requested.map_or(self.default_expires_in, |seconds| {
            seconds.min(self.max_expires_in)
        })
    }

    /// The client's preferred interval raised to the minimum, else the
    /// default.
    #[must_use]
    pub fn interval(&self, requested: Option<u64>) -> u64 {
        requested.map_or(self.default_interval, |seconds| seconds.max(self.min_interval))
    }
}

/// Builds the pending grant for an accepted backchannel request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CibaGrantFactory;

impl CibaGrantFactory {
    /// Creates a pending grant for `user`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the expiry overflows the clock.
    pub fn create(
        request: &BackchannelAuthenticationRequest,
        user: User,
        client: &ClientConfiguration,
        now: OffsetDateTime,
        policy: &CibaGrantPolicy,
    ) -> AuthResult<CibaGrant> {
        let expires_in = policy.expires_in(request.requested_expiry_seconds());
        let interval = policy.interval(client.backchannel_polling_interval);

        let mut builder =
            AuthorizationGrantBuilder::new(request.tenant_id.clone(), user, &client.client_id)
                .grant_type(GrantType::Ciba)
                .add_scopes(&request.scopes)
                .add_custom_properties(&request.custom_params);
        if let Some(details) = request
            .authorization_details
            .as_ref()
            .and_then(|value| AuthorizationDetails::parse(value).ok())
        {
            builder = builder.add_authorization_details(details);
        }

        Ok(CibaGrant {
            tenant_id: request.tenant_id.clone(),
            backchannel_request_id: request.identifier,
            auth_req_id: AuthReqId::generate(),
            grant: builder.build(),
            expired_at: expires_at(now, expires_in)?,
            interval,
            status: CibaGrantStatus::AuthorizationPending,
        })
    }
}
