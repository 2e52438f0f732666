//! Authorization request processing.
//!
//! [`OAuthRequestContextService`] turns raw parameters into a context,
//! resolving and verifying the request object when there is one.
//! [`OAuthRequestService`] runs the whole pipeline:
//!
//! 1. structural pre-check
//! 2. server and client configuration lookup
//! 3. pattern classification and context creation
//! 4. verifier chain
//! 5. persistence of the validated request
//!
//! # Usage
//!
//! ```ignore
//! use idp_auth::oauth::{OAuthRequestParameters, OAuthRequestService};
//!
//! let service = OAuthRequestService::new(servers, clients, requests, gateway, config);
//! let context = service
//!     .request(&tenant, OAuthRequestParameters::from_query(query), OffsetDateTime::now_utc())
//!     .await?;
//! ```

use std::sync::Arc;

use time::OffsetDateTime;

use super::{
    ContextInput, OAuthRequestContext, OAuthRequestParameters, OAuthRequestPattern,
    RequestObjectGateway, create_normal_context, create_request_object_context,
    create_request_uri_context,
};
use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::{AuthError, OAuthErrorCode};
use crate::jose::{JoseContext, JoseHandler, JoseKeys};
use crate::storage::{
    AuthorizationRequestRepository, ClientConfigurationRepository, ServerConfigurationRepository,
};
use crate::types::{ClientConfiguration, ServerConfiguration, TenantIdentifier};
use crate::verifier::{OAuthRequestVerifier, precheck};

// =============================================================================
// Context Service
// =============================================================================

/// Creates request contexts, one creator per pattern.
pub struct OAuthRequestContextService {
    gateway: Arc<dyn RequestObjectGateway>,
    jose: JoseHandler,
    config: Arc<AuthConfig>,
}

impl OAuthRequestContextService {
    #[must_use]
    pub fn new(gateway: Arc<dyn RequestObjectGateway>, config: Arc<AuthConfig>) -> Self {
        Self {
            gateway,
            jose: JoseHandler::new(),
            config,
        }
    }

    /// Creates the context of a request of the given pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the request object cannot be fetched (`invalid_request_uri`)
    /// - the request object fails JOSE processing or uses an algorithm the
    ///   server does not accept (`invalid_request_object`)
    /// - the resolved profile is not enabled (`unauthorized_client`)
    pub async fn create(
        &self,
        pattern: OAuthRequestPattern,
        input: ContextInput,
    ) -> AuthResult<OAuthRequestContext> {
        match pattern {
            OAuthRequestPattern::Normal => create_normal_context(input, &self.config),
            OAuthRequestPattern::RequestObject => {
                let token = input
                    .parameters
                    .request()
                    .ok_or_else(|| AuthError::invalid_request("request is empty"))?;
                let jose = self.handle(token, &input.server, &input.client)?;
                create_request_object_context(input, jose, &self.config)
            }
            OAuthRequestPattern::RequestUri => {
                let request_uri = input
                    .parameters
                    .request_uri()
                    .ok_or_else(|| AuthError::invalid_request("request_uri is empty"))?;
                let token = self.gateway.get(request_uri).await?;
                let jose = self.handle(&token, &input.server, &input.client)?;
                create_request_uri_context(input, jose, &self.config)
            }
        }
    }

    fn handle(
        &self,
        token: &str,
        server: &ServerConfiguration,
        client: &ClientConfiguration,
    ) -> AuthResult<JoseContext> {
        handle_request_object(&self.jose, token, server, client)
    }
}

/// Decrypts and verifies a request object, then checks its signing
/// algorithm against the server's allow-list.
pub(crate) fn handle_request_object(
    handler: &JoseHandler,
    token: &str,
    server: &ServerConfiguration,
    client: &ClientConfiguration,
) -> AuthResult<JoseContext> {
    let jose = handler.handle(token, &JoseKeys::for_request_object(server, client))?;

    if jose.is_signed() && !server.is_supported_request_object_alg(jose.algorithm()) {
        return Err(AuthError::bad_request(
            OAuthErrorCode::InvalidRequestObject,
            format!(
                "request object signing algorithm is not supported ({})",
                jose.algorithm()
            ),
        ));
    }

    Ok(jose)
}

// =============================================================================
// Request Service
// =============================================================================

/// Validates and stores authorization requests.
pub struct OAuthRequestService {
    servers: Arc<dyn ServerConfigurationRepository>,
    clients: Arc<dyn ClientConfigurationRepository>,
    requests: Arc<dyn AuthorizationRequestRepository>,
    contexts: OAuthRequestContextService,
    verifier: OAuthRequestVerifier,
}

impl OAuthRequestService {
    /// Creates a service with the default verifier chain.
    #[must_use]
    pub fn new(
        servers: Arc<dyn ServerConfigurationRepository>,
        clients: Arc<dyn ClientConfigurationRepository>,
        requests: Arc<dyn AuthorizationRequestRepository>,
        gateway: Arc<dyn RequestObjectGateway>,
        config: Arc<AuthConfig>,
    ) -> Self {
        let verifier =
            OAuthRequestVerifier::new(config.authorization.fapi_request_object_max_lifetime);
        Self {
            servers,
            clients,
            requests,
            contexts: OAuthRequestContextService::new(gateway, config),
            verifier,
        }
    }

    /// Replaces the verifier chain.
    #[must_use]
    pub fn with_verifier(mut self, verifier: OAuthRequestVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Processes an authorization request.
    ///
    /// On success the request has been stored and the returned context
    /// carries its identifier.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the pipeline. Configuration lookups fail
    /// with `ServerConfigurationNotFound` / `ClientConfigurationNotFound`;
    /// everything else is an OAuth error, redirectable once the redirect URI
    /// has been validated.
    pub async fn request(
        &self,
        tenant: &TenantIdentifier,
        parameters: OAuthRequestParameters,
        now: OffsetDateTime,
    ) -> AuthResult<OAuthRequestContext> {
        precheck(&parameters)?;
        let pattern = OAuthRequestPattern::classify(&parameters)?;

        let client_id = parameters
            .client_id()
            .ok_or_else(|| AuthError::invalid_request("client_id is required"))?
            .to_string();
        let server = self.servers.get(tenant).await?;
        let client = self.clients.get(tenant, &client_id).await?;

        let context = self
            .contexts
            .create(
                pattern,
                ContextInput {
                    parameters,
                    server,
                    client,
                    received_at: now,
                },
            )
            .await?;

        if let Err(e) = self.verifier.verify(&context) {
            tracing::debug!(
                tenant_id = %tenant,
                client_id = %client_id,
                pattern = %context.pattern(),
                profile = %context.profile(),
                error = %e,
                "Authorization request rejected"
            );
            return Err(e);
        }

        self.requests.register(context.request()).await?;

        tracing::debug!(
            tenant_id = %tenant,
            client_id = %client_id,
            pattern = %context.pattern(),
            profile = %context.profile(),
            request_id = %context.request().identifier,
            "Authorization request accepted"
        );

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::AuthorizationProfile;
    use crate::testing::{
        CLIENT_SECRET, ISSUER, MockStore, assert_error, now, request_object_times, sign_hs256,
        sign_ps256, tenant,
    };
    use serde_json::json;

    fn service(store: &Arc<MockStore>) -> OAuthRequestService {
        OAuthRequestService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(AuthConfig::default()),
        )
    }

    async fn request(store: &Arc<MockStore>, query: &str) -> AuthResult<OAuthRequestContext> {
        service(store)
            .request(&tenant(), OAuthRequestParameters::from_query(query), now())
            .await
    }

    #[tokio::test]
    async fn test_normal_request_is_stored() {
        let store = Arc::new(MockStore::with_fixtures());
        let context = request(
            &store,
            "client_id=client-1&response_type=code&scope=openid%20profile&state=s\
             &redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb",
        )
        .await
        .unwrap();

        assert_eq!(context.profile(), AuthorizationProfile::Oidc);
        assert_eq!(store.stored_requests(), 1);

        let requests: Arc<dyn AuthorizationRequestRepository> = store.clone();
        let stored = requests
            .get(&tenant(), &context.request().identifier)
            .await
            .unwrap();
        assert_eq!(&stored, context.request());
    }

    #[tokio::test]
    async fn test_rejected_request_is_not_stored() {
        let store = Arc::new(MockStore::with_fixtures());
        assert_error(
            request(&store, "client_id=client-1&scope=openid&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb").await,
            OAuthErrorCode::InvalidRequest,
            true,
        );
        assert_eq!(store.stored_requests(), 0);
    }

    #[tokio::test]
    async fn test_precheck_runs_before_lookup() {
        let store = Arc::new(MockStore::default());
        assert_error(
            request(&store, "response_type=code&scope=openid").await,
            OAuthErrorCode::InvalidRequest,
            false,
        );
    }

    #[tokio::test]
    async fn test_request_and_request_uri() {
        let store = Arc::new(MockStore::with_fixtures());
        assert_error(
            request(
                &store,
                "client_id=client-1&request=a.b.c&request_uri=https%3A%2F%2Fapp%2Fro",
            )
            .await,
            OAuthErrorCode::InvalidRequest,
            false,
        );
    }

    #[tokio::test]
    async fn test_unknown_tenant_and_client() {
        let store = Arc::new(MockStore::with_fixtures());
        let err = service(&store)
            .request(
                &TenantIdentifier::new("unknown"),
                OAuthRequestParameters::from_query("client_id=client-1"),
                now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServerConfigurationNotFound { .. }));

        let err = request(&store, "client_id=client-9&response_type=code")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ClientConfigurationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_request_object() {
        let store = Arc::new(MockStore::with_fixtures());
        let token = sign_ps256(&request_object_times(json!({
            "client_id": "client-1",
            "response_type": "code",
            "scope": "openid",
            "redirect_uri": "https://app.example.com/cb",
            "state": "from-object",
        })));

        let context = request(&store, &format!("client_id=client-1&request={token}"))
            .await
            .unwrap();
        assert_eq!(context.pattern(), OAuthRequestPattern::RequestObject);
        assert_eq!(context.request().state.as_deref(), Some("from-object"));
    }

    #[tokio::test]
    async fn test_request_object_with_bad_signature() {
        let store = Arc::new(MockStore::with_fixtures());
        let token = sign_hs256(
            &request_object_times(json!({"scope": "openid"})),
            "not-the-client-secret-0123456789abcdef",
        );
        let err = assert_error(
            request(&store, &format!("client_id=client-1&request={token}")).await,
            OAuthErrorCode::InvalidRequestObject,
            false,
        );
        assert!(matches!(err, AuthError::Jose(_)));
    }

    #[tokio::test]
    async fn test_request_object_algorithm_not_accepted() {
        let store = Arc::new(MockStore::with_fixtures());
        let mut server = crate::testing::server_configuration();
        server.request_object_signing_alg_values_supported = vec!["PS256".to_string()];
        store.add_server(server);

        let token = sign_hs256(&request_object_times(json!({"scope": "openid"})), CLIENT_SECRET);
        assert_error(
            request(&store, &format!("client_id=client-1&request={token}")).await,
            OAuthErrorCode::InvalidRequestObject,
            false,
        );
    }

    #[tokio::test]
    async fn test_request_uri() {
        let store = Arc::new(MockStore::with_fixtures());
        let token = sign_ps256(&request_object_times(json!({
            "client_id": "client-1",
            "response_type": "code",
            "scope": "profile",
            "state": "s",
        })));
        store.add_request_object("https://app.example.com/ro/1", token);

        let context = request(
            &store,
            "client_id=client-1&request_uri=https%3A%2F%2Fapp.example.com%2Fro%2F1",
        )
        .await
        .unwrap();
        assert_eq!(context.pattern(), OAuthRequestPattern::RequestUri);
        assert_eq!(
            context.request().request_uri.as_deref(),
            Some("https://app.example.com/ro/1")
        );
        assert_eq!(context.profile(), AuthorizationProfile::OAuth2);
    }

    #[tokio::test]
    async fn test_request_uri_not_found() {
        let store = Arc::new(MockStore::with_fixtures());
        assert_error(
            request(
                &store,
                "client_id=client-1&request_uri=https%3A%2F%2Fapp.example.com%2Fro%2Fmissing",
            )
            .await,
            OAuthErrorCode::InvalidRequestUri,
            false,
        );
    }

    #[tokio::test]
    async fn test_server_issued_request_object_is_verified_with_server_keys() {
        let store = Arc::new(MockStore::with_fixtures());
        // Without client keys only the server JWKS can verify the object.
        let mut client = crate::testing::client_configuration();
        client.jwks = None;
        store.add_client(&tenant(), client);

        let token = crate::testing::sign_rs256_server(&request_object_times(json!({
            "iss": ISSUER,
            "client_id": "client-1",
            "response_type": "code",
            "scope": "profile",
            "state": "s",
        })));
        let context = request(&store, &format!("client_id=client-1&request={token}"))
            .await
            .unwrap();
        assert!(context.jose().unwrap().is_server_issued());
    }
}
