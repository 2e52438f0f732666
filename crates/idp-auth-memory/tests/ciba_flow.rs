//! Backchannel authentication, polling and approval against the in-memory
//! store.

mod common;

use std::sync::Arc;

use idp_auth::ciba::BackchannelAuthenticationResult;
use idp_auth::oauth::OAuthRequestParameters;
use idp_auth::{
    AuthConfig, AuthResult, Authentication, CibaGrantService, CibaGrantStatus, CibaRequestService,
    OAuthErrorCode, SlowDownPolicy,
};
use idp_auth_memory::InMemoryStore;
use time::Duration;

use common::{CLIENT_ID, now, store, tenant};

fn request_service(store: &Arc<InMemoryStore>) -> CibaRequestService {
    CibaRequestService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(AuthConfig::default()),
    )
}

async fn backchannel_request(
    store: &Arc<InMemoryStore>,
    query: &str,
) -> AuthResult<BackchannelAuthenticationResult> {
    request_service(store)
        .request(&tenant(), OAuthRequestParameters::from_query(query), now())
        .await
}

async fn pending(store: &Arc<InMemoryStore>) -> BackchannelAuthenticationResult {
    backchannel_request(
        store,
        "client_id=client-1&scope=openid%20email&login_hint=email:alice@example.com\
         &binding_message=W4SCT&requested_expiry=120",
    )
    .await
    .unwrap()
}

fn assert_code<T: std::fmt::Debug>(result: AuthResult<T>, code: OAuthErrorCode) {
    let err = result.unwrap_err();
    assert_eq!(err.oauth_error_code(), code, "unexpected error: {err}");
    assert!(!err.is_redirectable());
}

#[tokio::test]
async fn test_polling_until_expiry() {
    let store = store();
    let result = pending(&store).await;
    let response = result.response(now());
    assert_eq!(response.expires_in, 120);
    assert_eq!(response.interval, 5);
    assert_eq!(store.backchannel_request_count(), 1);

    let grants = CibaGrantService::new(store.clone(), store.clone());
    let slow_down = SlowDownPolicy::default();
    let auth_req_id = &response.auth_req_id;

    // t=0
    slow_down.check(None, now(), response.interval).unwrap();
    assert_code(
        grants.poll(&tenant(), auth_req_id, CLIENT_ID, now()).await,
        OAuthErrorCode::AuthorizationPending,
    );

    // t=2, faster than the interval
    assert_code(
        slow_down.check(Some(now()), now() + Duration::seconds(2), response.interval),
        OAuthErrorCode::SlowDown,
    );
    assert_eq!(slow_down.next_interval(response.interval), 10);

    // t=121, past expires_in
    let late = now() + Duration::seconds(121);
    slow_down.check(Some(now()), late, response.interval).unwrap();
    assert_code(
        grants.poll(&tenant(), auth_req_id, CLIENT_ID, late).await,
        OAuthErrorCode::ExpiredToken,
    );
    assert_code(
        grants.authorize(&tenant(), auth_req_id, Authentication::new(late), late).await,
        OAuthErrorCode::ExpiredToken,
    );
}

#[tokio::test]
async fn test_approval_is_issued_once() {
    let store = store();
    let result = pending(&store).await;
    let auth_req_id = result.grant.auth_req_id.clone();
    let grants = CibaGrantService::new(store.clone(), store.clone());

    let authorized = grants
        .authorize(
            &tenant(),
            &auth_req_id,
            Authentication::new(now()).with_method("pwd").with_acr("urn:acr:1"),
            now() + Duration::seconds(30),
        )
        .await
        .unwrap();
    assert_eq!(authorized.status, CibaGrantStatus::Authorized);

    let issued = grants
        .poll(&tenant(), &auth_req_id, CLIENT_ID, now() + Duration::seconds(35))
        .await
        .unwrap();
    assert_eq!(issued.grant.subject(), "alice");
    assert!(issued.grant.scopes.contains("email"));
    assert_eq!(
        issued.grant.authentication.as_ref().and_then(|a| a.acr.as_deref()),
        Some("urn:acr:1")
    );

    assert_eq!(store.grant_count(), 0);
    assert_eq!(store.backchannel_request_count(), 0);
    assert_code(
        grants
            .poll(&tenant(), &auth_req_id, CLIENT_ID, now() + Duration::seconds(40))
            .await,
        OAuthErrorCode::InvalidGrant,
    );
}

#[tokio::test]
async fn test_denial_is_reported_once() {
    let store = store();
    let result = pending(&store).await;
    let auth_req_id = result.grant.auth_req_id.clone();
    let grants = CibaGrantService::new(store.clone(), store.clone());

    grants.deny(&tenant(), &auth_req_id, now()).await.unwrap();

    assert_code(
        grants.poll(&tenant(), &auth_req_id, CLIENT_ID, now()).await,
        OAuthErrorCode::AccessDenied,
    );
    assert_code(
        grants.poll(&tenant(), &auth_req_id, CLIENT_ID, now()).await,
        OAuthErrorCode::InvalidGrant,
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approval_and_denial() {
    let store = store();
    let result = pending(&store).await;
    let auth_req_id = result.grant.auth_req_id.clone();
    let grants = Arc::new(CibaGrantService::new(store.clone(), store.clone()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let grants = grants.clone();
        let auth_req_id = auth_req_id.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                grants
                    .authorize(&tenant(), &auth_req_id, Authentication::new(now()), now())
                    .await
            } else {
                grants.deny(&tenant(), &auth_req_id, now()).await
            }
        }));
    }

    let mut decided = Vec::new();
    for handle in handles {
        if let Ok(grant) = handle.await.unwrap() {
            decided.push(grant.status);
        }
    }
    assert_eq!(decided.len(), 1);

    let polled = grants.poll(&tenant(), &auth_req_id, CLIENT_ID, now()).await;
    match decided[0] {
        CibaGrantStatus::Authorized => assert!(polled.is_ok()),
        CibaGrantStatus::AccessDenied => assert_code(polled, OAuthErrorCode::AccessDenied),
        CibaGrantStatus::AuthorizationPending => panic!("grant left pending"),
    }
}

#[tokio::test]
async fn test_unknown_user_creates_nothing() {
    let store = store();
    assert_code(
        backchannel_request(
            &store,
            "client_id=client-1&scope=openid&login_hint=email:bob@example.com",
        )
        .await,
        OAuthErrorCode::UnknownUserId,
    );
    assert_eq!(store.backchannel_request_count(), 0);
    assert_eq!(store.grant_count(), 0);
}

#[tokio::test]
async fn test_poll_by_another_client() {
    let store = store();
    let result = pending(&store).await;
    let grants = CibaGrantService::new(store.clone(), store.clone());

    assert_code(
        grants
            .poll(&tenant(), &result.grant.auth_req_id, "client-2", now())
            .await,
        OAuthErrorCode::InvalidGrant,
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_polls_redeem_once() {
    let store = store();
    let result = pending(&store).await;
    let auth_req_id = result.grant.auth_req_id.clone();
    let grants = Arc::new(CibaGrantService::new(store.clone(), store.clone()));

    grants
        .authorize(&tenant(), &auth_req_id, Authentication::new(now()), now())
        .await
        .unwrap();

    let at = now() + Duration::seconds(10);
    let tenant_id = tenant();
    let (first, second) = tokio::join!(
        grants.poll(&tenant_id, &auth_req_id, CLIENT_ID, at),
        grants.poll(&tenant_id, &auth_req_id, CLIENT_ID, at),
    );

    let (issued, rejected) = match (first, second) {
        (Ok(grant), Err(err)) | (Err(err), Ok(grant)) => (grant, err),
        (first, second) => panic!("expected exactly one redemption: {first:?} {second:?}"),
    };
    assert_eq!(issued.status, CibaGrantStatus::Authorized);
    assert_eq!(rejected.oauth_error_code(), OAuthErrorCode::InvalidGrant);
    assert_eq!(store.grant_count(), 0);
}

#[tokio::test]
async fn test_expired_grants_are_cleaned_up() {
    let store = store();
    let result = pending(&store).await;
    let grants = CibaGrantService::new(store.clone(), store.clone());

    for late in [
        Duration::seconds(121),
        Duration::seconds(3600),
        Duration::days(365),
    ] {
        assert_code(
            grants
                .poll(&tenant(), &result.grant.auth_req_id, CLIENT_ID, now() + late)
                .await,
            OAuthErrorCode::ExpiredToken,
        );
    }
    assert_eq!(store.grant_count(), 1);

    assert_eq!(
        grants
            .cleanup_expired(now() + Duration::seconds(121))
            .await
            .unwrap(),
        1
    );
    assert_eq!(store.grant_count(), 0);
    assert_eq!(store.backchannel_request_count(), 0);
}
