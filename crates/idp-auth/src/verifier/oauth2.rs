//! OAuth 2.0 base rules (RFC 6749 section 4.1.1 and 4.2.1).
//!
//! The redirect URI is validated first. Until it is, errors are returned
//! directly; after that they are redirected to the client.

use super::AuthorizationRequestVerifier;
use crate::AuthResult;
use crate::error::{AuthError, OAuthErrorCode};
use crate::oauth::{AuthorizationProfile, OAuthRequestContext, ResponseMode, ResponseType};

/// Base verifier of requests without `openid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OAuth2Verifier;

impl AuthorizationRequestVerifier for OAuth2Verifier {
    fn profile(&self) -> AuthorizationProfile {
        AuthorizationProfile::OAuth2
    }

    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        verify_oauth2(context)
    }
}

/// The OAuth 2.0 rules, shared by the OpenID Connect and FAPI verifiers.
pub(crate) fn verify_oauth2(context: &OAuthRequestContext) -> AuthResult<()> {
    verify_redirect_uri(context)?;
    verify_response_type(context)?;
    verify_response_mode(context)?;
    verify_scope(context)
}

pub(crate) fn verify_redirect_uri(context: &OAuthRequestContext) -> AuthResult<()> {
    let client = context.client();

    let Some(redirect_uri) = context.request().redirect_uri.as_deref() else {
        return match client.redirect_uris.len() {
            1 => Ok(()),
            0 => Err(AuthError::invalid_request(
                "client has no registered redirect_uri",
            )),
            _ => Err(AuthError::invalid_request(
                "on multiple registered redirect uris, authorization request redirect_uri must contains",
            )),
        };
    };

    let parsed = url::Url::parse(redirect_uri).map_err(|_| {
        AuthError::invalid_request(format!(
            "authorization request redirect_uri is invalid ({redirect_uri})"
        ))
    })?;
    if parsed.fragment().is_some() {
        return Err(AuthError::invalid_request(format!(
            "redirect_uri must not fragment ({redirect_uri})"
        )));
    }

    if !client.is_registered_redirect_uri(redirect_uri) {
        return Err(AuthError::invalid_request(format!(
            "authorization request redirect_uri does not match registered redirect uris ({redirect_uri})"
        )));
    }

    Ok(())
}

pub(crate) fn verify_response_type(context: &OAuthRequestContext) -> AuthResult<()> {
    let Some(raw) = context.request().response_type.as_deref() else {
        return Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            "response type is required in authorization request",
        ));
    };

    let Some(response_type) = ResponseType::parse(raw) else {
        return Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            format!("response type is unknown type ({raw})"),
        ));
    };

    if !context.server().is_supported_response_type(raw) {
        return Err(context.redirectable(
            OAuthErrorCode::UnsupportedResponseType,
            format!("authorization server is unsupported response_type ({response_type})"),
        ));
    }

    if !context.client().is_registered_response_type(raw) {
        return Err(context.redirectable(
            OAuthErrorCode::UnauthorizedClient,
            format!("client is unauthorized response_type ({response_type})"),
        ));
    }

    Ok(())
}

fn verify_response_mode(context: &OAuthRequestContext) -> AuthResult<()> {
    let Some(raw) = context.request().response_mode.as_deref() else {
        return Ok(());
    };

    if ResponseMode::parse(raw).is_none() || !context.server().is_supported_response_mode(raw) {
        return Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            format!("authorization server is unsupported response_mode ({raw})"),
        ));
    }

    Ok(())
}

pub(crate) fn verify_scope(context: &OAuthRequestContext) -> AuthResult<()> {
    if !context.request().scopes.is_empty() {
        return Ok(());
    }

    // A request object without `scope` is a defective object, not a scope
    // problem.
    if let Some(claims) = context.request_object_claims()
        && !claims.contains("scope")
    {
        return Err(context.redirectable(
            OAuthErrorCode::InvalidRequestObject,
            "request object does not contain scope",
        ));
    }

    Err(context.redirectable(
        OAuthErrorCode::InvalidScope,
        format!(
            "authorization request does not contains valid scope ({})",
            context.parameters().get("scope").unwrap_or_default()
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::jose::{JoseHandler, JoseKeys};
    use crate::oauth::{
        ContextInput, OAuthRequestParameters, create_normal_context, create_request_object_context,
    };
    use crate::testing::{
        REDIRECT_URI, assert_error, client_configuration, now, request_object_times,
        server_configuration, sign_ps256,
    };
    use crate::types::{ClientConfiguration, ServerConfiguration};
    use serde_json::json;

    fn context_with(
        query: &str,
        server: ServerConfiguration,
        client: ClientConfiguration,
    ) -> OAuthRequestContext {
        create_normal_context(
            ContextInput {
                parameters: OAuthRequestParameters::from_query(query),
                server,
                client,
                received_at: now(),
            },
            &AuthConfig::default(),
        )
        .unwrap()
    }

    fn context(query: &str) -> OAuthRequestContext {
        context_with(query, server_configuration(), client_configuration())
    }

    #[test]
    fn test_valid_request() {
        let ctx = context("client_id=client-1&response_type=code&scope=profile&state=s");
        assert!(OAuth2Verifier.verify(&ctx).is_ok());
    }

    #[test]
    fn test_missing_response_type() {
        let ctx = context("client_id=client-1&scope=profile&state=s");
        let err = assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::InvalidRequest, true);
        let target = err.redirect_target().unwrap();
        assert_eq!(target.redirect_uri, REDIRECT_URI);
        assert_eq!(target.state.as_deref(), Some("s"));
    }

    #[test]
    fn test_unknown_response_type() {
        let ctx = context("client_id=client-1&response_type=code%20device&scope=profile");
        assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::InvalidRequest, true);
    }

    #[test]
    fn test_response_type_not_supported_by_server() {
        let mut server = server_configuration();
        server.response_types_supported = vec!["code".to_string()];
        let mut client = client_configuration();
        client.response_types = vec!["code".to_string()];

        let ctx = context_with(
            "client_id=client-1&response_type=token&scope=profile",
            server,
            client,
        );
        let err = assert_error(
            OAuth2Verifier.verify(&ctx),
            OAuthErrorCode::UnsupportedResponseType,
            true,
        );
        assert_eq!(err.redirect_target().unwrap().redirect_uri, REDIRECT_URI);
    }

    #[test]
    fn test_response_type_not_registered_for_client() {
        let ctx = context("client_id=client-1&response_type=id_token%20token&scope=profile");
        assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::UnauthorizedClient, true);
    }

    #[test]
    fn test_unsupported_response_mode() {
        let ctx = context("client_id=client-1&response_type=code&scope=profile&response_mode=fragment.jwt");
        assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::InvalidRequest, true);
    }

    #[test]
    fn test_no_valid_scope() {
        let ctx = context("client_id=client-1&response_type=code&scope=admin");
        assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::InvalidScope, true);
    }

    #[test]
    fn test_request_object_without_scope() {
        let server = server_configuration();
        let client = client_configuration();
        let token = sign_ps256(&request_object_times(json!({
            "response_type": "code",
            "client_id": "client-1",
        })));
        let jose = JoseHandler::new()
            .handle(&token, &JoseKeys::for_request_object(&server, &client))
            .unwrap();
        let ctx = create_request_object_context(
            ContextInput {
                parameters: OAuthRequestParameters::from_query(&format!(
                    "client_id=client-1&request={token}"
                )),
                server,
                client,
                received_at: now(),
            },
            jose,
            &AuthConfig::default(),
        )
        .unwrap();

        assert_error(
            OAuth2Verifier.verify(&ctx),
            OAuthErrorCode::InvalidRequestObject,
            true,
        );
    }

    #[test]
    fn test_redirect_uri_with_fragment() {
        let ctx = context(
            "client_id=client-1&response_type=code&scope=profile\
             &redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb%23frag",
        );
        assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::InvalidRequest, false);
    }

    #[test]
    fn test_redirect_uri_not_registered() {
        let ctx = context(
            "client_id=client-1&response_type=code&scope=profile\
             &redirect_uri=https%3A%2F%2Fevil.example.com%2Fcb",
        );
        assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::InvalidRequest, false);
    }

    #[test]
    fn test_redirect_uri_required_with_multiple_registrations() {
        let mut client = client_configuration();
        client
            .redirect_uris
            .push("https://app.example.com/other".to_string());
        let ctx = context_with(
            "client_id=client-1&response_type=code&scope=profile",
            server_configuration(),
            client,
        );
        assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::InvalidRequest, false);
    }

    #[test]
    fn test_redirect_uri_checked_before_response_type() {
        let ctx = context(
            "client_id=client-1&scope=profile&redirect_uri=https%3A%2F%2Fevil.example.com%2Fcb",
        );
        assert_error(OAuth2Verifier.verify(&ctx), OAuthErrorCode::InvalidRequest, false);
    }
}
