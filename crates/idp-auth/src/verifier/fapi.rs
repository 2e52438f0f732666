//! Financial-grade API Security Profile 1.0 rules.
//!
//! - Part 1 (Baseline), section 5.2.2
//! - Part 2 (Advanced), section 5.2.2
//!
//! Both profiles first validate the redirect URI strictly, then apply the
//! OpenID Connect rules when `openid` is requested and the OAuth 2.0 rules
//! otherwise.

use std::time::Duration;

use super::AuthorizationRequestVerifier;
use super::fapi_rules::{self, FapiClaimViolation};
use super::oauth2::verify_oauth2;
use super::oidc::verify_oidc;
use crate::AuthResult;
use crate::error::{AuthError, OAuthErrorCode};
use crate::oauth::{AuthorizationProfile, OAuthRequestContext, ResponseType};
use crate::types::ClientAuthenticationType;

fn verify_base(context: &OAuthRequestContext) -> AuthResult<()> {
    if context.request().scopes.has_openid() {
        verify_oidc(context)
    } else {
        verify_oauth2(context)
    }
}

fn invalid_request_object(context: &OAuthRequestContext, violation: FapiClaimViolation) -> AuthError {
    context.redirectable(
        OAuthErrorCode::InvalidRequestObject,
        format!("When FAPI Advanced profile, {violation}"),
    )
}

fn is_https(uri: &str) -> bool {
    url::Url::parse(uri).is_ok_and(|url| url.scheme() == "https")
}

/// `nonce` is required with `openid`, `state` without.
fn verify_nonce_or_state(context: &OAuthRequestContext) -> AuthResult<()> {
    let request = context.request();
    if request.scopes.has_openid() {
        if request.nonce.is_none() {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "When using FAPI profile with openid scope, nonce is required",
            ));
        }
    } else if request.state.is_none() {
        return Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            "When using FAPI profile without openid scope, state is required",
        ));
    }
    Ok(())
}

// =============================================================================
// Baseline
// =============================================================================

/// FAPI 1.0 Baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct FapiBaselineVerifier;

impl AuthorizationRequestVerifier for FapiBaselineVerifier {
    fn profile(&self) -> AuthorizationProfile {
        AuthorizationProfile::FapiBaseline
    }

    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        self.verify_redirect_uri(context)?;
        verify_base(context)?;
        self.verify_client_authentication(context)?;
        self.verify_pkce(context)?;
        verify_nonce_or_state(context)
    }
}

impl FapiBaselineVerifier {
    /// Redirect URIs must be pre-registered, sent, matched exactly, and use
    /// https.
    fn verify_redirect_uri(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        if context.client().redirect_uris.is_empty() {
            return Err(AuthError::invalid_request(
                "When FAPI Baseline profile, shall require redirect URIs to be pre-registered",
            ));
        }

        let Some(redirect_uri) = context.request().redirect_uri.as_deref() else {
            return Err(AuthError::invalid_request(
                "When FAPI Baseline profile, shall require the redirect_uri in the authorization request",
            ));
        };

        if !context.client().is_registered_redirect_uri(redirect_uri) {
            return Err(AuthError::invalid_request(format!(
                "When FAPI Baseline profile, shall require the value of redirect_uri to exactly match one of the pre-registered redirect URIs ({redirect_uri})"
            )));
        }

        if !is_https(redirect_uri) {
            return Err(AuthError::invalid_request(format!(
                "When FAPI Baseline profile, shall shall require redirect URIs to use the https scheme ({redirect_uri})"
            )));
        }

        Ok(())
    }

    fn verify_client_authentication(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let method = context.client().token_endpoint_auth_method;
        if matches!(
            method,
            ClientAuthenticationType::ClientSecretBasic | ClientAuthenticationType::ClientSecretPost
        ) {
            return Err(context.redirectable(
                OAuthErrorCode::UnauthorizedClient,
                format!(
                    "When FAPI Baseline profile, client_secret_basic or client_secret_post is not allowed ({method})"
                ),
            ));
        }
        Ok(())
    }

    fn verify_pkce(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let request = context.request();
        if request.code_challenge.is_none() || request.code_challenge_method.is_none() {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "When FAPI Baseline profile, authorization request must contains code_challenge and code_challenge_method(S256)",
            ));
        }
        if request.code_challenge_method.as_deref() != Some("S256") {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "When FAPI Baseline profile, shall require code_challenge_method to be S256",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Advanced
// =============================================================================

/// FAPI 1.0 Advanced.
#[derive(Debug, Clone, Copy)]
pub struct FapiAdvancedVerifier {
    max_request_object_lifetime: Duration,
}

impl FapiAdvancedVerifier {
    /// `max_request_object_lifetime` bounds `exp - nbf` and how far `nbf`
    /// may lie in the past (60 minutes in the profile).
    #[must_use]
    pub fn new(max_request_object_lifetime: Duration) -> Self {
        Self {
            max_request_object_lifetime,
        }
    }

    fn max_lifetime_seconds(&self) -> i64 {
        fapi_rules::max_lifetime_seconds(self.max_request_object_lifetime)
    }
}

impl Default for FapiAdvancedVerifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl AuthorizationRequestVerifier for FapiAdvancedVerifier {
    fn profile(&self) -> AuthorizationProfile {
        AuthorizationProfile::FapiAdvanced
    }

    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        self.verify_jarm_configuration(context)?;
        verify_base(context)?;
        self.verify_https_redirect_uri(context)?;
        verify_nonce_or_state(context)?;
        self.verify_client_authentication(context)?;
        self.verify_request_object(context)?;
        self.verify_response_type(context)?;
        self.verify_sender_constrained_tokens(context)?;
        self.verify_confidential_client(context)?;
        self.verify_request_object_lifetime(context)?;
        self.verify_audience(context)?;
        self.verify_not_before(context)
    }
}

impl FapiAdvancedVerifier {
    /// A JARM response needs a client signing algorithm the server has a
    /// key for.
    fn verify_jarm_configuration(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let is_jwt_mode = context
            .request()
            .response_mode()
            .is_some_and(|mode| mode.is_jwt());
        if !is_jwt_mode {
            return Ok(());
        }

        let Some(alg) = context.client().authorization_signed_response_alg.as_deref() else {
            return Err(AuthError::bad_request(
                OAuthErrorCode::UnauthorizedClient,
                "When FAPI Advanced profile and jarm mode, client config must have authorization_signed_response_alg",
            ));
        };

        if !context.server().has_key_for_algorithm(alg) {
            return Err(AuthError::bad_request(
                OAuthErrorCode::UnauthorizedClient,
                format!(
                    "When FAPI Advanced profile and jarm mode, server jwks must have client authorization_signed_response_alg ({alg})"
                ),
            ));
        }

        Ok(())
    }

    fn verify_https_redirect_uri(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        match context.redirect_uri() {
            Some(uri) if is_https(uri) => Ok(()),
            uri => Err(AuthError::invalid_request(format!(
                "When FAPI Advanced profile, shall shall require redirect URIs to use the https scheme ({})",
                uri.unwrap_or_default()
            ))),
        }
    }

    fn verify_client_authentication(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let method = context.client().token_endpoint_auth_method;
        if !method.is_asymmetric_or_mtls() && method != ClientAuthenticationType::None {
            return Err(context.redirectable(
                OAuthErrorCode::UnauthorizedClient,
                format!(
                    "When FAPI Advanced profile, client_secret_basic, client_secret_post and client_secret_jwt are not allowed ({method})"
                ),
            ));
        }
        Ok(())
    }

    /// The request must be a signed request object using PS256 or ES256.
    fn verify_request_object(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let Some(jose) = context.jose().filter(|_| context.is_request_parameter_pattern()) else {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "When FAPI Advanced profile, shall only use the parameters included in the signed request object passed via the request or request_uri parameter",
            ));
        };

        if !jose.is_signed() {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequestObject,
                "When FAPI Advanced profile, request object must be signed",
            ));
        }

        fapi_rules::verify_signing_algorithm(jose.algorithm())
            .map_err(|v| invalid_request_object(context, v))
    }

    /// `code id_token`, or `code` with a JARM response mode.
    fn verify_response_type(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let request = context.request();
        let is_jwt_mode = request.response_mode().is_some_and(|mode| mode.is_jwt());
        match request.response_type() {
            Some(ResponseType::CodeIdToken) => Ok(()),
            Some(ResponseType::Code) if is_jwt_mode => Ok(()),
            _ => Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                format!(
                    "When FAPI Advanced profile, shall require the response_type value code id_token, or the response_type value code in conjunction with the response_mode value jwt ({})",
                    request.response_type.as_deref().unwrap_or_default()
                ),
            )),
        }
    }

    fn verify_sender_constrained_tokens(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        if !context.server().tls_client_certificate_bound_access_tokens {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "When FAPI Advanced profile, shall only issue sender-constrained access tokens, but server tls_client_certificate_bound_access_tokens is false",
            ));
        }
        if !context.client().tls_client_certificate_bound_access_tokens {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "When FAPI Advanced profile, shall only issue sender-constrained access tokens, but client tls_client_certificate_bound_access_tokens is false",
            ));
        }
        Ok(())
    }

    fn verify_confidential_client(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        if context.client().is_public() {
            return Err(context.redirectable(
                OAuthErrorCode::UnauthorizedClient,
                "When FAPI Advanced profile, shall not support public clients",
            ));
        }
        Ok(())
    }

    /// `exp - nbf` must not exceed the maximum lifetime.
    fn verify_request_object_lifetime(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        fapi_rules::request_object_lifetime(
            context.request_object_claims(),
            self.max_lifetime_seconds(),
        )
        .map(|_| ())
        .map_err(|v| invalid_request_object(context, v))
    }

    fn verify_audience(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        fapi_rules::verify_audience(context.request_object_claims(), &context.server().issuer)
            .map_err(|v| invalid_request_object(context, v))
    }

    /// `nbf` must not lie further in the past than the maximum lifetime.
    fn verify_not_before(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        fapi_rules::verify_not_before_age(
            context.request_object_claims(),
            context.received_at().unix_timestamp(),
            self.max_lifetime_seconds(),
        )
        .map_err(|v| invalid_request_object(context, v))
    }
}
