//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::datetime;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::AuthResult;
use crate::ciba::{
    AuthReqId, BackchannelAuthenticationRequest, BackchannelAuthenticationRequestIdentifier,
    CibaGrant, CibaGrantStatus,
};
use crate::error::{AuthError, OAuthErrorCode};
use crate::oauth::{AuthorizationRequest, AuthorizationRequestIdentifier, RequestObjectGateway};
use crate::storage::{
    AuthorizationRequestRepository, BackchannelAuthenticationRequestRepository,
    CibaGrantRepository, ClientConfigurationRepository, ServerConfigurationRepository,
    UserQueryRepository,
};
use crate::types::{
    ClientAuthenticationType, ClientConfiguration, GrantType, ServerConfiguration,
    TenantIdentifier, User,
};

pub(crate) const RSA_PRIVATE_PEM: &str = include_str!("../tests/fixtures/rsa_private.pem");
pub(crate) const EC_PRIVATE_PEM: &str = include_str!("../tests/fixtures/ec_private.pem");
const JWKS_JSON: &str = include_str!("../tests/fixtures/jwks.json");

pub(crate) const ISSUER: &str = "https://idp.example.com";
pub(crate) const CLIENT_ID: &str = "client-1";
pub(crate) const CLIENT_SECRET: &str = "client-secret-0123456789abcdef0123456789";
pub(crate) const REDIRECT_URI: &str = "https://app.example.com/cb";

/// Fixed clock for deterministic tests.
pub(crate) fn now() -> OffsetDateTime {
    datetime!(2026-01-15 10:00:00 UTC)
}

pub(crate) fn tenant() -> TenantIdentifier {
    TenantIdentifier::new("tenant-1")
}

pub(crate) fn client_jwks() -> JwkSet {
    serde_json::from_str(JWKS_JSON).unwrap()
}

// =============================================================================
// Token builders
// =============================================================================

fn sign(claims: &Value, algorithm: Algorithm, kid: Option<&str>, key: &EncodingKey) -> String {
    let mut header = Header::new(algorithm);
    header.kid = kid.map(ToString::to_string);
    jsonwebtoken::encode(&header, claims, key).unwrap()
}

pub(crate) fn sign_ps256(claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM.as_bytes()).unwrap();
    sign(claims, Algorithm::PS256, Some("rsa-1"), &key)
}

pub(crate) fn sign_rs256_server(claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM.as_bytes()).unwrap();
    sign(claims, Algorithm::RS256, Some("rsa-rs256"), &key)
}

pub(crate) fn sign_es256(claims: &Value) -> String {
    let key = EncodingKey::from_ec_pem(EC_PRIVATE_PEM.as_bytes()).unwrap();
    sign(claims, Algorithm::ES256, Some("ec-1"), &key)
}

pub(crate) fn sign_hs256(claims: &Value, secret: &str) -> String {
    sign(claims, Algorithm::HS256, None, &EncodingKey::from_secret(secret.as_bytes()))
}

/// `alg=none` JWT with an empty signature.
pub(crate) fn encode_unsigned(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{payload}.")
}

// =============================================================================
// Configuration fixtures
// =============================================================================

pub(crate) fn server_configuration() -> ServerConfiguration {
    let mut server = ServerConfiguration::new(tenant(), ISSUER);
    server.jwks = client_jwks();
    server.decryption_key_pem = Some(RSA_PRIVATE_PEM.to_string());
    server.scopes_supported = [
        "openid", "profile", "email", "phone", "read", "write", "payments",
    ]
    .map(String::from)
    .to_vec();
    server.response_types_supported = [
        "code",
        "id_token",
        "token",
        "code id_token",
        "code token",
        "id_token token",
        "code id_token token",
        "none",
    ]
    .map(String::from)
    .to_vec();
    server.response_modes_supported = ["query", "fragment", "form_post", "jwt", "query.jwt"]
        .map(String::from)
        .to_vec();
    server.grant_types_supported = [
        "authorization_code",
        "implicit",
        "urn:openid:params:grant-type:ciba",
    ]
    .map(String::from)
    .to_vec();
    server.request_object_signing_alg_values_supported =
        ["PS256", "ES256", "RS256", "HS256"].map(String::from).to_vec();
    server.authorization_details_types_supported = ["payment_initiation", "account_information"]
        .map(String::from)
        .to_vec();
    server.tls_client_certificate_bound_access_tokens = true;
    server.backchannel_token_delivery_modes_supported = ["poll", "ping"].map(String::from).to_vec();
    server.fapi_baseline_scopes = vec!["read".to_string()];
    server.fapi_advanced_scopes = vec!["write".to_string()];
    server
}

pub(crate) fn client_configuration() -> ClientConfiguration {
    let mut client = ClientConfiguration::new(CLIENT_ID);
    client.client_secret = Some(CLIENT_SECRET.to_string());
    client.redirect_uris = vec![REDIRECT_URI.to_string()];
    client.response_types = ["code", "id_token", "token", "code id_token", "code token"]
        .map(String::from)
        .to_vec();
    client.grant_types = vec![
        GrantType::AuthorizationCode,
        GrantType::Implicit,
        GrantType::Ciba,
    ];
    client.scope = "openid profile email phone read write payments".to_string();
    client.token_endpoint_auth_method = ClientAuthenticationType::PrivateKeyJwt;
    client.jwks = Some(client_jwks());
    client.tls_client_certificate_bound_access_tokens = true;
    client.authorization_signed_response_alg = Some("PS256".to_string());
    client.backchannel_token_delivery_mode = Some("poll".to_string());
    client.authorization_details_types = vec!["payment_initiation".to_string()];
    client
}

/// `exp`, `nbf`, `iat` and `aud` for a request object valid at [`now`].
pub(crate) fn request_object_times(mut claims: Value) -> Value {
    let now = now().unix_timestamp();
    if let Value::Object(map) = &mut claims {
        map.entry("iss").or_insert(Value::from(CLIENT_ID));
        map.entry("aud").or_insert(Value::from(ISSUER));
        map.entry("iat").or_insert(Value::from(now));
        map.entry("nbf").or_insert(Value::from(now - 10));
        map.entry("exp").or_insert(Value::from(now + 600));
    }
    claims
}

// =============================================================================
// Mock repositories
// =============================================================================

fn key(tenant: &TenantIdentifier, id: impl std::fmt::Display) -> String {
    format!("{tenant}/{id}")
}

/// One in-memory store implementing every repository trait.
#[derive(Default)]
pub(crate) struct MockStore {
    servers: RwLock<HashMap<String, ServerConfiguration>>,
    clients: RwLock<HashMap<String, ClientConfiguration>>,
    requests: RwLock<HashMap<String, AuthorizationRequest>>,
    users: RwLock<Vec<(TenantIdentifier, User)>>,
    grants: RwLock<HashMap<String, CibaGrant>>,
    backchannel_requests: RwLock<HashMap<String, BackchannelAuthenticationRequest>>,
    request_objects: RwLock<HashMap<String, String>>,
}

impl MockStore {
    /// A store holding the fixture server and client.
    pub(crate) fn with_fixtures() -> Self {
        let store = Self::default();
        store.add_server(server_configuration());
        store.add_client(&tenant(), client_configuration());
        store
    }

    pub(crate) fn add_server(&self, server: ServerConfiguration) {
        self.servers
            .write()
            .unwrap()
            .insert(server.tenant_id.to_string(), server);
    }

    pub(crate) fn add_client(&self, tenant: &TenantIdentifier, client: ClientConfiguration) {
        self.clients
            .write()
            .unwrap()
            .insert(key(tenant, &client.client_id), client);
    }

    pub(crate) fn add_user(&self, tenant: &TenantIdentifier, user: User) {
        self.users.write().unwrap().push((tenant.clone(), user));
    }

    pub(crate) fn add_request_object(&self, uri: &str, object: String) {
        self.request_objects
            .write()
            .unwrap()
            .insert(uri.to_string(), object);
    }

    pub(crate) fn stored_requests(&self) -> usize {
        self.requests.read().unwrap().len()
    }

    pub(crate) fn stored_grants(&self) -> usize {
        self.grants.read().unwrap().len()
    }

    pub(crate) fn stored_backchannel_requests(&self) -> usize {
        self.backchannel_requests.read().unwrap().len()
    }

    fn find_user(&self, tenant: &TenantIdentifier, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.users
            .read()
            .unwrap()
            .iter()
            .find(|(t, user)| t == tenant && predicate(user))
            .map(|(_, user)| user.clone())
    }
}

#[async_trait]
impl ServerConfigurationRepository for MockStore {
    async fn get(&self, tenant: &TenantIdentifier) -> AuthResult<ServerConfiguration> {
        self.servers
            .read()
            .unwrap()
            .get(tenant.as_str())
            .cloned()
            .ok_or_else(|| AuthError::ServerConfigurationNotFound {
                tenant_id: tenant.to_string(),
            })
    }
}

#[async_trait]
impl ClientConfigurationRepository for MockStore {
    async fn get(
        &self,
        tenant: &TenantIdentifier,
        client_id: &str,
    ) -> AuthResult<ClientConfiguration> {
        self.clients
            .read()
            .unwrap()
            .get(&key(tenant, client_id))
            .cloned()
            .ok_or_else(|| AuthError::ClientConfigurationNotFound {
                client_id: client_id.to_string(),
            })
    }
}

#[async_trait]
impl AuthorizationRequestRepository for MockStore {
    async fn register(&self, request: &AuthorizationRequest) -> AuthResult<()> {
        self.requests
            .write()
            .unwrap()
            .insert(key(&request.tenant_id, request.identifier), request.clone());
        Ok(())
    }

    async fn find(
        &self,
        tenant: &TenantIdentifier,
        id: &AuthorizationRequestIdentifier,
    ) -> AuthResult<Option<AuthorizationRequest>> {
        Ok(self.requests.read().unwrap().get(&key(tenant, id)).cloned())
    }

    async fn delete(
        &self,
        tenant: &TenantIdentifier,
        id: &AuthorizationRequestIdentifier,
    ) -> AuthResult<()> {
        self.requests.write().unwrap().remove(&key(tenant, id));
        Ok(())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut requests = self.requests.write().unwrap();
        let before = requests.len();
        requests.retain(|_, request| !request.is_expired(now));
        Ok((before - requests.len()) as u64)
    }
}

#[async_trait]
impl UserQueryRepository for MockStore {
    async fn get(&self, tenant: &TenantIdentifier, sub: &str) -> AuthResult<Option<User>> {
        Ok(self.find_user(tenant, |u| u.sub == sub))
    }

    async fn find_by_email(
        &self,
        tenant: &TenantIdentifier,
        email: &str,
        provider_id: &str,
    ) -> AuthResult<Option<User>> {
        Ok(self.find_user(tenant, |u| {
            u.email.as_deref() == Some(email) && u.provider_id == provider_id
        }))
    }

    async fn find_by_phone(
        &self,
        tenant: &TenantIdentifier,
        phone_number: &str,
        provider_id: &str,
    ) -> AuthResult<Option<User>> {
        Ok(self.find_user(tenant, |u| {
            u.phone_number.as_deref() == Some(phone_number) && u.provider_id == provider_id
        }))
    }
}

#[async_trait]
impl CibaGrantRepository for MockStore {
    async fn register(&self, grant: &CibaGrant) -> AuthResult<()> {
        self.grants
            .write()
            .unwrap()
            .insert(key(&grant.tenant_id, &grant.auth_req_id), grant.clone());
        Ok(())
    }

    async fn find(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
    ) -> AuthResult<Option<CibaGrant>> {
        Ok(self.grants.read().unwrap().get(&key(tenant, auth_req_id)).cloned())
    }

    async fn update(&self, grant: &CibaGrant, expected: CibaGrantStatus) -> AuthResult<bool> {
        let mut grants = self.grants.write().unwrap();
        match grants.get_mut(&key(&grant.tenant_id, &grant.auth_req_id)) {
            Some(stored) if stored.status == expected => {
                *stored = grant.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn take(
        &self,
        tenant: &TenantIdentifier,
        auth_req_id: &AuthReqId,
        expected: CibaGrantStatus,
    ) -> AuthResult<Option<CibaGrant>> {
        let mut grants = self.grants.write().unwrap();
        let key = key(tenant, auth_req_id);
        if grants.get(&key).is_some_and(|grant| grant.status == expected) {
            return Ok(grants.remove(&key));
        }
        Ok(None)
    }

    async fn delete(&self, tenant: &TenantIdentifier, auth_req_id: &AuthReqId) -> AuthResult<()> {
        self.grants.write().unwrap().remove(&key(tenant, auth_req_id));
        Ok(())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut grants = self.grants.write().unwrap();
        let before = grants.len();
        grants.retain(|_, grant| !grant.is_expired(now));
        Ok((before - grants.len()) as u64)
    }
}

#[async_trait]
impl BackchannelAuthenticationRequestRepository for MockStore {
    async fn register(&self, request: &BackchannelAuthenticationRequest) -> AuthResult<()> {
        self.backchannel_requests
            .write()
            .unwrap()
            .insert(key(&request.tenant_id, request.identifier), request.clone());
        Ok(())
    }

    async fn find(
        &self,
        tenant: &TenantIdentifier,
        id: &BackchannelAuthenticationRequestIdentifier,
    ) -> AuthResult<Option<BackchannelAuthenticationRequest>> {
        Ok(self
            .backchannel_requests
            .read()
            .unwrap()
            .get(&key(tenant, id))
            .cloned())
    }

    async fn delete(
        &self,
        tenant: &TenantIdentifier,
        id: &BackchannelAuthenticationRequestIdentifier,
    ) -> AuthResult<()> {
        self.backchannel_requests
            .write()
            .unwrap()
            .remove(&key(tenant, id));
        Ok(())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut requests = self.backchannel_requests.write().unwrap();
        let before = requests.len();
        requests.retain(|_, request| !request.is_expired(now));
        Ok((before - requests.len()) as u64)
    }
}

#[async_trait]
impl RequestObjectGateway for MockStore {
    async fn get(&self, request_uri: &str) -> AuthResult<String> {
        self.request_objects
            .read()
            .unwrap()
            .get(request_uri)
            .cloned()
            .ok_or_else(|| {
                AuthError::bad_request(OAuthErrorCode::InvalidRequestUri, "request_uri not found")
            })
    }
}

/// Asserts the OAuth error code and redirectability of a failure.
pub(crate) fn assert_error<T: std::fmt::Debug>(
    result: AuthResult<T>,
    code: OAuthErrorCode,
    redirectable: bool,
) -> AuthError {
    let err = result.unwrap_err();
    assert_eq!(err.oauth_error_code(), code, "unexpected error: {err}");
    assert_eq!(err.is_redirectable(), redirectable, "redirectability of: {err}");
    err
}
