//! Backchannel authentication and grant lifecycle.
//!
//! [`CibaRequestService`] handles the backchannel authentication endpoint:
//!
//! 1. structural pre-check and pattern classification
//! 2. server and client configuration lookup
//! 3. request object handling and context creation
//! 4. profile verifier
//! 5. user hint resolution
//! 6. persistence of the request and its pending grant
//!
//! [`CibaGrantService`] moves the grant through its states: the
//! authentication device approves or denies, the token endpoint polls.
//! Client authentication happens before either service is called.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    AuthReqId, BackchannelAuthenticationRequest, CibaGrant, CibaGrantFactory, CibaGrantPolicy,
    CibaGrantStatus, CibaRequestVerifiers, create_ciba_context,
};
use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::{AuthError, OAuthErrorCode};
use crate::grant::Authentication;
use crate::hint::{UserHintRelatedParams, UserHintResolvers};
use crate::jose::JoseHandler;
use crate::oauth::service::handle_request_object;
use crate::oauth::{ContextInput, OAuthRequestParameters, OAuthRequestPattern};
use crate::storage::{
    BackchannelAuthenticationRequestRepository, CibaGrantRepository,
    ClientConfigurationRepository, ServerConfigurationRepository, UserQueryRepository,
};
use crate::types::TenantIdentifier;
use crate::verifier::precheck;

/// Successful backchannel authentication response (CIBA Core 7.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackchannelAuthenticationResponse {
    pub auth_req_id: AuthReqId,
    pub expires_in: u64,
    pub interval: u64,
}

/// An accepted backchannel request and its pending grant.
#[derive(Debug, Clone)]
pub struct BackchannelAuthenticationResult {
    pub request: BackchannelAuthenticationRequest,
    pub grant: CibaGrant,
}

impl BackchannelAuthenticationResult {
    /// The response returned to the client at `now`.
    #[must_use]
    pub fn response(&self, now: OffsetDateTime) -> BackchannelAuthenticationResponse {
        BackchannelAuthenticationResponse {
            auth_req_id: self.grant.auth_req_id.clone(),
            expires_in: self.grant.expires_in(now),
            interval: self.grant.interval,
        }
    }
}

// =============================================================================
// Request Service
// =============================================================================

/// Validates backchannel authentication requests and creates their grants.
pub struct CibaRequestService {
    servers: Arc<dyn ServerConfigurationRepository>,
    clients: Arc<dyn ClientConfigurationRepository>,
    requests: Arc<dyn BackchannelAuthenticationRequestRepository>,
    grants: Arc<dyn CibaGrantRepository>,
    users: Arc<dyn UserQueryRepository>,
    jose: JoseHandler,
    verifiers: CibaRequestVerifiers,
    resolvers: UserHintResolvers,
    config: Arc<AuthConfig>,
}

impl CibaRequestService {
    #[must_use]
    pub fn new(
        servers: Arc<dyn ServerConfigurationRepository>,
        clients: Arc<dyn ClientConfigurationRepository>,
        requests: Arc<dyn BackchannelAuthenticationRequestRepository>,
        grants: Arc<dyn CibaGrantRepository>,
        users: Arc<dyn UserQueryRepository>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            servers,
            clients,
            requests,
            grants,
            users,
            jose: JoseHandler::new(),
            verifiers: CibaRequestVerifiers::new(&config),
            resolvers: UserHintResolvers::new(),
            config,
        }
    }

    /// Replaces the profile verifiers.
    #[must_use]
    pub fn with_verifiers(mut self, verifiers: CibaRequestVerifiers) -> Self {
        self.verifiers = verifiers;
        self
    }

    /// Replaces the user hint resolvers.
    #[must_use]
    pub fn with_resolvers(mut self, resolvers: UserHintResolvers) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Processes a backchannel authentication request.
    ///
    /// # Errors
    ///
    /// Returns the first failure: pre-check and verifier errors as
    /// `BadRequest` (or `InvalidClient`), `unknown_user_id` when the hint
    /// names no user, and configuration lookup or storage failures.
    pub async fn request(
        &self,
        tenant: &TenantIdentifier,
        parameters: OAuthRequestParameters,
        now: OffsetDateTime,
    ) -> AuthResult<BackchannelAuthenticationResult> {
        precheck(&parameters)?;
        let pattern = OAuthRequestPattern::classify(&parameters)?;
        if pattern == OAuthRequestPattern::RequestUri {
            return Err(AuthError::invalid_request(
                "request_uri is not supported for backchannel authentication",
            ));
        }

        let client_id = parameters
            .client_id()
            .ok_or_else(|| AuthError::invalid_request("client_id is required"))?
            .to_string();
        let server = self.servers.get(tenant).await?;
        let client = self.clients.get(tenant, &client_id).await?;

        let jose = match parameters.request() {
            Some(token) => Some(handle_request_object(&self.jose, token, &server, &client)?),
            None => None,
        };

        let context = create_ciba_context(
            ContextInput {
                parameters,
                server,
                client,
                received_at: now,
            },
            pattern,
            jose,
        )?;

        if let Err(e) = self.verifiers.verify(&context) {
            tracing::debug!(
                tenant_id = %tenant,
                client_id = %client_id,
                pattern = %context.pattern(),
                profile = %context.profile(),
                error = %e,
                "Backchannel authentication request rejected"
            );
            return Err(e);
        }

        let hint = context
            .request()
            .user_hint()
            .ok_or_else(|| AuthError::invalid_request("user hint is required"))?;
        let related = UserHintRelatedParams {
            server: context.server(),
            client: context.client(),
        };
        let Some(user) = self
            .resolvers
            .resolve(tenant, &hint, related, self.users.as_ref())
            .await?
        else {
            tracing::debug!(
                tenant_id = %tenant,
                client_id = %client_id,
                hint_type = %hint.hint_type,
                "User hint did not resolve to a user"
            );
            return Err(AuthError::bad_request(
                OAuthErrorCode::UnknownUserId,
                "user hint does not identify a known user",
            ));
        };

        let policy = CibaGrantPolicy::new(&self.config.ciba, context.server());
        let grant = CibaGrantFactory::create(context.request(), user, context.client(), now, &policy)?;

        let mut request = context.request().clone();
        request.expires_at = Some(grant.expired_at);

        self.requests.register(&request).await?;
        self.grants.register(&grant).await?;

        tracing::debug!(
            tenant_id = %tenant,
            client_id = %client_id,
            profile = %context.profile(),
            auth_req_id = %grant.auth_req_id,
            expires_in = grant.expires_in(now),
            interval = grant.interval,
            "Backchannel authentication request accepted"
        );

        Ok(BackchannelAuthenticationResult { request, grant })
    }
}

// =============================================================================
// Grant Service
// =============================================================================

/// Approval, denial and polling of CIBA grants.
pub struct CibaGrantService {
    grants: Arc<dyn CibaGrantRepository>,
    requests: Arc<dyn BackchannelAuthenticationRequestRepository>,
}

impl CibaGrantService {
    #[must_use]
    pub fn new(
        grants: Arc<dyn CibaGrantRepository>,
        requests: Arc<dyn BackchannelAuthenticationRequestRepository>,
    ) -> Self {
        Self { grants, requests }
    }

    /// Token endpoint poll.
    ///
    /// A decided grant is redeemed by the poll that observes it: the grant
    /// and its backchannel request are deleted, and an authorized grant is
    /// returned for token issuance. Concurrent polls of the same grant get
    /// `invalid_grant`.
    ///
    /// # Errors
    ///
    /// - `invalid_grant` if the grant is unknown, belongs to another client
    ///   or was already redeemed
    /// - `expired_token` once the grant has expired
    /// - `authorization_pending` while the user has not decided
    /// - `access_denied` if the user denied
    pub async fn poll(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
        client_id: &str,
        now: OffsetDateTime,
    ) -> AuthResult<CibaGrant> {
        let grant = self
            .grants
            .find(tenant, auth_req_id)
            .await?
            .filter(|grant| grant.client_id() == client_id)
            .ok_or_else(|| AuthError::invalid_grant("auth_req_id is not valid for this client"))?;

        if grant.is_expired(now) {
            return Err(AuthError::bad_request(
                OAuthErrorCode::ExpiredToken,
                "auth_req_id has expired",
            ));
        }

        if grant.is_pending() {
            return Err(AuthError::bad_request(
                OAuthErrorCode::AuthorizationPending,
                "authorization is pending",
            ));
        }

        let Some(grant) = self.grants.take(tenant, auth_req_id, grant.status).await? else {
            tracing::debug!(
                tenant_id = %tenant,
                client_id = %client_id,
                auth_req_id = %auth_req_id,
                "CIBA grant redeemed concurrently"
            );
            return Err(AuthError::invalid_grant("auth_req_id was already used"));
        };
        self.requests
            .delete(tenant, &grant.backchannel_request_id)
            .await?;

        tracing::debug!(
            tenant_id = %tenant,
            client_id = %client_id,
            auth_req_id = %auth_req_id,
            status = %grant.status,
            "CIBA grant redeemed"
        );

        if grant.is_denied() {
            return Err(AuthError::bad_request(
                OAuthErrorCode::AccessDenied,
                "the user denied the request",
            ));
        }
        Ok(grant)
    }

    /// Records the user's approval.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn authorize(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
        authentication: Authentication,
        now: OffsetDateTime,
    ) -> AuthResult<CibaGrant> {
        self.transition(tenant, auth_req_id, CibaGrantStatus::Authorized, Some(authentication), now)
            .await
    }

    /// Records the user's denial.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn deny(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
        now: OffsetDateTime,
    ) -> AuthResult<CibaGrant> {
        self.transition(tenant, auth_req_id, CibaGrantStatus::AccessDenied, None, now)
            .await
    }

    /// Deletes grants and backchannel requests expired at `now`.
    ///
    /// Returns the number of grants deleted.
    ///
    /// # Errors
    ///
    /// Returns storage failures.
    pub async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let grants = self.grants.cleanup_expired(now).await?;
        let requests = self.requests.cleanup_expired(now).await?;
        if grants > 0 || requests > 0 {
            tracing::debug!(grants, requests, "Expired CIBA grants removed");
        }
        Ok(grants)
    }

    /// Moves a pending grant to `status`.
    ///
    /// # Errors
    ///
    /// - `invalid_grant` if the grant is unknown, or another decision was
    ///   stored first
    /// - `expired_token` once the grant has expired
    /// - `InvalidTransition` if the grant is already decided
    async fn transition(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
        status: CibaGrantStatus,
        authentication: Option<Authentication>,
        now: OffsetDateTime,
    ) -> AuthResult<CibaGrant> {
        let current = self
            .grants
            .find(tenant, auth_req_id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("auth_req_id is not valid"))?;

        if current.is_expired(now) {
            return Err(AuthError::bad_request(
                OAuthErrorCode::ExpiredToken,
                "auth_req_id has expired",
            ));
        }

        let mut next = current.update(status)?;
        if let Some(authentication) = authentication {
            next.grant.authentication = Some(authentication);
        }

        if !self.grants.update(&next, current.status).await? {
            tracing::debug!(
                tenant_id = %tenant,
                auth_req_id = %auth_req_id,
                status = %status,
                "CIBA grant changed concurrently"
            );
            return Err(AuthError::invalid_grant("auth_req_id was already decided"));
        }

        tracing::debug!(
            tenant_id = %tenant,
            client_id = %next.client_id(),
            auth_req_id = %auth_req_id,
            status = %status,
            "CIBA grant updated"
        );

        Ok(next)
    }
}
