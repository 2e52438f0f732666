//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use idp_auth::types::{ClientAuthenticationType, ClientConfiguration, GrantType, ServerConfiguration};
use idp_auth::{TenantIdentifier, User};
use idp_auth_memory::InMemoryStore;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::datetime;
use tracing_subscriber::EnvFilter;

pub const ISSUER: &str = "https://idp.example.com";
pub const CLIENT_ID: &str = "client-1";
pub const CLIENT_SECRET: &str = "client-secret-0123456789abcdef0123456789";
pub const REDIRECT_URI: &str = "https://app.example.com/cb";

static TRACING: Once = Once::new();

/// Routes `tracing` output to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn now() -> OffsetDateTime {
    datetime!(2026-01-15 10:00:00 UTC)
}

pub fn tenant() -> TenantIdentifier {
    TenantIdentifier::new("tenant-1")
}

pub fn server() -> ServerConfiguration {
    let mut server = ServerConfiguration::new(tenant(), ISSUER);
    server.scopes_supported = ["openid", "profile", "email"].map(String::from).to_vec();
    server.response_types_supported = ["code", "code id_token"].map(String::from).to_vec();
    server.response_modes_supported = ["query", "fragment"].map(String::from).to_vec();
    server.grant_types_supported = ["authorization_code", "urn:openid:params:grant-type:ciba"]
        .map(String::from)
        .to_vec();
    server.request_object_signing_alg_values_supported = vec!["HS256".to_string()];
    server.backchannel_token_delivery_modes_supported = vec!["poll".to_string()];
    server
}

pub fn client() -> ClientConfiguration {
    let mut client = ClientConfiguration::new(CLIENT_ID);
    client.client_secret = Some(CLIENT_SECRET.to_string());
    client.token_endpoint_auth_method = ClientAuthenticationType::ClientSecretBasic;
    client.redirect_uris = vec![REDIRECT_URI.to_string()];
    client.response_types = vec!["code".to_string()];
    client.grant_types = vec![GrantType::AuthorizationCode, GrantType::Ciba];
    client.scope = "openid profile email".to_string();
    client.backchannel_token_delivery_mode = Some("poll".to_string());
    client
}

/// A store holding the fixture server, client and the user `alice`.
pub fn store() -> Arc<InMemoryStore> {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    store.add_server(server());
    store.add_client(&tenant(), client());
    store.add_user(&tenant(), User::new("alice").with_email("alice@example.com"));
    store
}

/// Signs `claims` with the client secret after filling in the registered
/// claims a request object needs at [`now`].
pub fn request_object(mut claims: Value) -> String {
    let now = now().unix_timestamp();
    if let Value::Object(map) = &mut claims {
        map.entry("iss").or_insert(Value::from(CLIENT_ID));
        map.entry("aud").or_insert(Value::from(ISSUER));
        map.entry("iat").or_insert(Value::from(now));
        map.entry("nbf").or_insert(Value::from(now - 10));
        map.entry("exp").or_insert(Value::from(now + 600));
    }
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(CLIENT_SECRET.as_bytes()),
    )
    .unwrap()
}
