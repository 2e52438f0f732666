//! Authorization requests processed end to end against the in-memory store.

mod common;

use std::sync::Arc;

use idp_auth::oauth::OAuthRequestParameters;
use idp_auth::{
    AuthConfig, AuthError, AuthResult, AuthorizationProfile, AuthorizationRequestRepository,
    OAuthErrorCode, OAuthRequestContext, OAuthRequestPattern, OAuthRequestService,
};
use idp_auth_memory::InMemoryStore;
use serde_json::json;
use time::Duration;

use common::{CLIENT_ID, REDIRECT_URI, now, request_object, store, tenant};

fn service(store: &Arc<InMemoryStore>) -> OAuthRequestService {
    OAuthRequestService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(AuthConfig::default()),
    )
}

async fn request(store: &Arc<InMemoryStore>, query: &str) -> AuthResult<OAuthRequestContext> {
    service(store)
        .request(&tenant(), OAuthRequestParameters::from_query(query), now())
        .await
}

#[tokio::test]
async fn test_code_flow_request_is_stored_and_deleted() {
    let store = store();
    let context = request(
        &store,
        "client_id=client-1&response_type=code&scope=openid%20profile&state=xyz\
         &redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb",
    )
    .await
    .unwrap();

    assert_eq!(context.pattern(), OAuthRequestPattern::Normal);
    assert_eq!(context.profile(), AuthorizationProfile::Oidc);
    assert_eq!(store.authorization_request_count(), 1);

    let id = context.request().identifier;
    let stored = AuthorizationRequestRepository::get(store.as_ref(), &tenant(), &id)
        .await
        .unwrap();
    assert_eq!(stored.client_id, CLIENT_ID);
    assert_eq!(stored.redirect_uri.as_deref(), Some(REDIRECT_URI));
    assert_eq!(stored.state.as_deref(), Some("xyz"));

    AuthorizationRequestRepository::delete(store.as_ref(), &tenant(), &id)
        .await
        .unwrap();
    let err = AuthorizationRequestRepository::get(store.as_ref(), &tenant(), &id)
        .await
        .unwrap_err();
    assert_eq!(err.oauth_error_code(), OAuthErrorCode::InvalidRequest);
}

#[tokio::test]
async fn test_request_uri_flow() {
    let store = store();
    store.add_request_object(
        "https://app.example.com/ro/1",
        request_object(json!({
            "client_id": CLIENT_ID,
            "response_type": "code",
            "scope": "openid email",
            "redirect_uri": REDIRECT_URI,
            "state": "from-object",
        })),
    );

    let context = request(
        &store,
        "client_id=client-1&request_uri=https%3A%2F%2Fapp.example.com%2Fro%2F1",
    )
    .await
    .unwrap();

    assert_eq!(context.pattern(), OAuthRequestPattern::RequestUri);
    assert_eq!(context.request().state.as_deref(), Some("from-object"));
    assert!(context.request().scopes.contains("email"));
}

#[tokio::test]
async fn test_unregistered_redirect_uri_is_not_redirected() {
    let store = store();
    let err = request(
        &store,
        "client_id=client-1&response_type=code&scope=openid&state=xyz\
         &redirect_uri=https%3A%2F%2Fevil.example.com%2Fcb",
    )
    .await
    .unwrap_err();

    assert!(!err.is_redirectable());
    assert_eq!(err.oauth_error_code(), OAuthErrorCode::InvalidRequest);
    assert_eq!(store.authorization_request_count(), 0);
}

#[tokio::test]
async fn test_unknown_tenant() {
    let store = store();
    let err = service(&store)
        .request(
            &idp_auth::TenantIdentifier::new("tenant-2"),
            OAuthRequestParameters::from_query("client_id=client-1&response_type=code"),
            now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ServerConfigurationNotFound { .. }));
}

#[tokio::test]
async fn test_abandoned_requests_are_cleaned_up() {
    let store = store();
    let context = request(
        &store,
        "client_id=client-1&response_type=code&scope=openid&state=xyz\
         &redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb",
    )
    .await
    .unwrap();
    let expires_at = context.request().expires_at;

    let cleaned = AuthorizationRequestRepository::cleanup_expired(
        store.as_ref(),
        expires_at - Duration::seconds(1),
    )
    .await
    .unwrap();
    assert_eq!(cleaned, 0);

    let cleaned = AuthorizationRequestRepository::cleanup_expired(store.as_ref(), expires_at)
        .await
        .unwrap();
    assert_eq!(cleaned, 1);
    assert_eq!(store.authorization_request_count(), 0);
}
