use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use idp_auth::AuthResult;
use idp_auth::ciba::{
    AuthReqId, BackchannelAuthenticationRequest, BackchannelAuthenticationRequestIdentifier,
    CibaGrant, CibaGrantStatus,
};
use idp_auth::error::{AuthError, OAuthErrorCode};
use idp_auth::oauth::{AuthorizationRequest, AuthorizationRequestIdentifier, RequestObjectGateway};
use idp_auth::storage::{
    AuthorizationRequestRepository, BackchannelAuthenticationRequestRepository,
    CibaGrantRepository, ClientConfigurationRepository, ServerConfigurationRepository,
    UserQueryRepository,
};
use idp_auth::types::{ClientConfiguration, ServerConfiguration, TenantIdentifier, User};

pub type StoreKey = String; // Format: "tenant/id"

pub(crate) fn make_store_key(tenant: &TenantIdentifier, id: impl std::fmt::Display) -> StoreKey {
    format!("{tenant}/{id}")
}

/// In-memory storage for every `idp-auth` repository.
///
/// Each record kind lives in its own `DashMap`, keyed by tenant and record
/// identifier. Grant updates hold the shard lock of their entry for the
/// whole compare-and-set, so concurrent approvals, denials and consumption
/// of the same `auth_req_id` are serialized.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    servers: DashMap<String, ServerConfiguration>,
    clients: DashMap<StoreKey, ClientConfiguration>,
    users: DashMap<StoreKey, User>,
    authorization_requests: DashMap<StoreKey, AuthorizationRequest>,
    backchannel_requests: DashMap<StoreKey, BackchannelAuthenticationRequest>,
    grants: DashMap<StoreKey, CibaGrant>,
    request_objects: DashMap<String, String>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the server configuration of its tenant.
    pub fn add_server(&self, server: ServerConfiguration) {
        self.servers.insert(server.tenant_id.to_string(), server);
    }

    /// Registers or replaces a client of `tenant`.
    pub fn add_client(&self, tenant: &TenantIdentifier, client: ClientConfiguration) {
        self.clients
            .insert(make_store_key(tenant, &client.client_id), client);
    }

    /// Registers or replaces a user of `tenant`, keyed by subject.
    pub fn add_user(&self, tenant: &TenantIdentifier, user: User) {
        self.users.insert(make_store_key(tenant, &user.sub), user);
    }

    /// Makes `object` retrievable through `request_uri`.
    pub fn add_request_object(&self, request_uri: impl Into<String>, object: impl Into<String>) {
        self.request_objects.insert(request_uri.into(), object.into());
    }

    pub fn authorization_request_count(&self) -> usize {
        self.authorization_requests.len()
    }

    pub fn backchannel_request_count(&self) -> usize {
        self.backchannel_requests.len()
    }

    pub fn grant_count(&self) -> usize {
        self.grants.len()
    }

    fn find_user(&self, tenant: &TenantIdentifier, predicate: impl Fn(&User) -> bool) -> Option<User> {
        let prefix = format!("{tenant}/");
        self.users
            .iter()
            .find(|entry| entry.key().starts_with(&prefix) && predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

/// Drops the entries `is_expired` selects and returns how many went.
fn retain_unexpired<V>(map: &DashMap<StoreKey, V>, is_expired: impl Fn(&V) -> bool) -> u64 {
    let mut removed = 0;
    map.retain(|_, value| {
        let expired = is_expired(value);
        if expired {
            removed += 1;
        }
        !expired
    });
    removed
}

#[async_trait]
impl ServerConfigurationRepository for InMemoryStore {
    async fn get(&self, tenant: &TenantIdentifier) -> AuthResult<ServerConfiguration> {
        self.servers
            .get(tenant.as_str())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AuthError::ServerConfigurationNotFound {
                tenant_id: tenant.to_string(),
            })
    }
}

#[async_trait]
impl ClientConfigurationRepository for InMemoryStore {
    async fn get(
        &self,
        tenant: &TenantIdentifier,
        client_id: &str,
    ) -> AuthResult<ClientConfiguration> {
        self.clients
            .get(&make_store_key(tenant, client_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AuthError::ClientConfigurationNotFound {
                client_id: client_id.to_string(),
            })
    }
}

#[async_trait]
impl AuthorizationRequestRepository for InMemoryStore {
    async fn register(&self, request: &AuthorizationRequest) -> AuthResult<()> {
        self.authorization_requests.insert(
            make_store_key(&request.tenant_id, request.identifier),
            request.clone(),
        );
        Ok(())
    }

    async fn find(
        &self,
        tenant: &TenantIdentifier,
        id: &AuthorizationRequestIdentifier,
    ) -> AuthResult<Option<AuthorizationRequest>> {
        Ok(self
            .authorization_requests
            .get(&make_store_key(tenant, id))
            .map(|entry| entry.value().clone()))
    }

    async fn delete(
        &self,
        tenant: &TenantIdentifier,
        id: &AuthorizationRequestIdentifier,
    ) -> AuthResult<()> {
        self.authorization_requests.remove(&make_store_key(tenant, id));
        Ok(())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        Ok(retain_unexpired(&self.authorization_requests, |request| {
            request.is_expired(now)
        }))
    }
}

#[async_trait]
impl UserQueryRepository for InMemoryStore {
    async fn get(&self, tenant: &TenantIdentifier, sub: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .get(&make_store_key(tenant, sub))
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_email(
        &self,
        tenant: &TenantIdentifier,
        email: &str,
        provider_id: &str,
    ) -> AuthResult<Option<User>> {
        Ok(self.find_user(tenant, |user| {
            user.email.as_deref() == Some(email) && user.provider_id == provider_id
        }))
    }

    async fn find_by_phone(
        &self,
        tenant: &TenantIdentifier,
        phone_number: &str,
        provider_id: &str,
    ) -> AuthResult<Option<User>> {
        Ok(self.find_user(tenant, |user| {
            user.phone_number.as_deref() == Some(phone_number) && user.provider_id == provider_id
        }))
    }
}

#[async_trait]
impl BackchannelAuthenticationRequestRepository for InMemoryStore {
    async fn register(&self, request: &BackchannelAuthenticationRequest) -> AuthResult<()> {
        self.backchannel_requests.insert(
            make_store_key(&request.tenant_id, request.identifier),
            request.clone(),
        );
        Ok(())
    }

    async fn find(
        &self,
        tenant: &TenantIdentifier,
        id: &BackchannelAuthenticationRequestIdentifier,
    ) -> AuthResult<Option<BackchannelAuthenticationRequest>> {
        Ok(self
            .backchannel_requests
            .get(&make_store_key(tenant, id))
            .map(|entry| entry.value().clone()))
    }

    async fn delete(
        &self,
        tenant: &TenantIdentifier,
        id: &BackchannelAuthenticationRequestIdentifier,
    ) -> AuthResult<()> {
        self.backchannel_requests.remove(&make_store_key(tenant, id));
        Ok(())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        Ok(retain_unexpired(&self.backchannel_requests, |request| {
            request.is_expired(now)
        }))
    }
}

#[async_trait]
impl CibaGrantRepository for InMemoryStore {
    async fn register(&self, grant: &CibaGrant) -> AuthResult<()> {
        self.grants.insert(
            make_store_key(&grant.tenant_id, &grant.auth_req_id),
            grant.clone(),
        );
        Ok(())
    }

    async fn find(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
    ) -> AuthResult<Option<CibaGrant>> {
        Ok(self
            .grants
            .get(&make_store_key(tenant, auth_req_id))
            .map(|entry| entry.value().clone()))
    }

    async fn update(&self, grant: &CibaGrant, expected: CibaGrantStatus) -> AuthResult<bool> {
        let key = make_store_key(&grant.tenant_id, &grant.auth_req_id);
        // The RefMut keeps the shard write-locked until it is dropped.
        let Some(mut stored) = self.grants.get_mut(&key) else {
            return Ok(false);
        };

        if stored.status != expected {
            tracing::debug!(
                tenant_id = %grant.tenant_id,
                auth_req_id = %grant.auth_req_id,
                expected = %expected,
                actual = %stored.status,
                "CIBA grant status changed concurrently"
            );
            return Ok(false);
        }

        *stored = grant.clone();
        Ok(true)
    }

    async fn take(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
        expected: CibaGrantStatus,
    ) -> AuthResult<Option<CibaGrant>> {
        Ok(self
            .grants
            .remove_if(&make_store_key(tenant, auth_req_id), |_, grant| {
                grant.status == expected
            })
            .map(|(_, grant)| grant))
    }

    async fn delete(&self, tenant: &TenantIdentifier, auth_req_id: &AuthReqId) -> AuthResult<()> {
        self.grants.remove(&make_store_key(tenant, auth_req_id));
        Ok(())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        Ok(retain_unexpired(&self.grants, |grant| grant.is_expired(now)))
    }
}

#[async_trait]
impl RequestObjectGateway for InMemoryStore {
    async fn get(&self, request_uri: &str) -> AuthResult<String> {
        self.request_objects
            .get(request_uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                AuthError::bad_request(
                    OAuthErrorCode::InvalidRequestUri,
                    format!("no request object at {request_uri}"),
                )
            })
    }
}
