//! Backchannel authentication request verification.
//!
//! - CIBA Core 1.0 section 7.1 and 13 for the base rules
//! - FAPI: Client Initiated Backchannel Authentication Profile section 5.2.2
//!
//! Errors are never redirected: the backchannel endpoint answers the client
//! directly.

use std::collections::HashMap;
use std::time::Duration;

use super::{CibaProfile, CibaRequestContext};
use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::{AuthError, OAuthErrorCode};
use crate::types::GrantType;
use crate::verifier::fapi_rules::{self, FapiClaimViolation};

/// Rules of one backchannel profile.
pub trait CibaRequestVerifier: Send + Sync {
    fn profile(&self) -> CibaProfile;

    /// Verifies the request.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    fn verify(&self, context: &CibaRequestContext) -> AuthResult<()>;
}

// =============================================================================
// CIBA
// =============================================================================

/// CIBA Core rules.
#[derive(Debug, Clone, Copy)]
pub struct CibaVerifier {
    binding_message_max_length: usize,
}

impl CibaVerifier {
    #[must_use]
    pub fn new(binding_message_max_length: usize) -> Self {
        Self {
            binding_message_max_length,
        }
    }
}

impl Default for CibaVerifier {
    fn default() -> Self {
        Self::new(AuthConfig::default().ciba.binding_message_max_length)
    }
}

impl CibaRequestVerifier for CibaVerifier {
    fn profile(&self) -> CibaProfile {
        CibaProfile::Ciba
    }

    fn verify(&self, context: &CibaRequestContext) -> AuthResult<()> {
        self.verify_scope(context)?;
        self.verify_hint(context)?;
        self.verify_grant_type(context)?;
        self.verify_delivery_mode(context)?;
        self.verify_binding_message(context)?;
        self.verify_requested_expiry(context)?;
        self.verify_user_code(context)?;
        self.verify_request_object(context)
    }
}

impl CibaVerifier {
    fn verify_scope(&self, context: &CibaRequestContext) -> AuthResult<()> {
        if !context.request().scopes.has_openid() {
            return Err(AuthError::invalid_request(
                "backchannel authentication request must contain openid scope",
            ));
        }
        Ok(())
    }

    /// Exactly one of `login_hint`, `id_token_hint`, `login_hint_token`.
    fn verify_hint(&self, context: &CibaRequestContext) -> AuthResult<()> {
        match context.request().hint_count() {
            1 => Ok(()),
            0 => Err(AuthError::invalid_request(
                "backchannel authentication request must contain one of login_hint, id_token_hint or login_hint_token",
            )),
            _ => Err(AuthError::invalid_request(
                "backchannel authentication request must contain only one of login_hint, id_token_hint or login_hint_token",
            )),
        }
    }

    fn verify_grant_type(&self, context: &CibaRequestContext) -> AuthResult<()> {
        if !context
            .server()
            .is_supported_grant_type(GrantType::Ciba.as_str())
        {
            return Err(AuthError::bad_request(
                OAuthErrorCode::UnauthorizedClient,
                "server does not support the CIBA grant type",
            ));
        }
        if !context.client().is_registered_grant_type(GrantType::Ciba) {
            return Err(AuthError::bad_request(
                OAuthErrorCode::UnauthorizedClient,
                "client is not registered for the CIBA grant type",
            ));
        }
        Ok(())
    }

    /// The client's delivery mode must be enabled; ping needs a
    /// `client_notification_token`.
    fn verify_delivery_mode(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let Some(mode) = context.client().backchannel_token_delivery_mode.as_deref() else {
            return Ok(());
        };
        if !context.server().is_supported_delivery_mode(mode) {
            return Err(AuthError::bad_request(
                OAuthErrorCode::UnauthorizedClient,
                format!("backchannel token delivery mode is not supported ({mode})"),
            ));
        }
        if mode == "ping" && context.request().client_notification_token.is_none() {
            return Err(AuthError::invalid_request(
                "client_notification_token is required for ping mode",
            ));
        }
        Ok(())
    }

    fn verify_binding_message(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let Some(message) = context.request().binding_message.as_deref() else {
            return Ok(());
        };
        if message.chars().count() > self.binding_message_max_length {
            return Err(AuthError::bad_request(
                OAuthErrorCode::InvalidBindingMessage,
                format!(
                    "binding_message must not exceed {} characters",
                    self.binding_message_max_length
                ),
            ));
        }
        Ok(())
    }

    fn verify_requested_expiry(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let request = context.request();
        if request.requested_expiry.is_some() && request.requested_expiry_seconds().is_none() {
            return Err(AuthError::invalid_request(
                "requested_expiry must be a positive integer",
            ));
        }
        Ok(())
    }

    fn verify_user_code(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let required = context.server().backchannel_user_code_parameter_supported
            && context.client().backchannel_user_code_parameter;
        if required && context.request().user_code.is_none() {
            return Err(AuthError::bad_request(
                OAuthErrorCode::MissingUserCode,
                "user_code is required for this client",
            ));
        }
        Ok(())
    }

    /// A signed request must come from the client and must not be expired.
    fn verify_request_object(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let Some(claims) = context.request_object_claims() else {
            return Ok(());
        };

        if claims.iss() != Some(context.client().client_id.as_str()) {
            return Err(AuthError::invalid_request(
                "request object iss must be the client_id",
            ));
        }

        if claims
            .exp()
            .is_some_and(|exp| exp <= context.received_at().unix_timestamp())
        {
            return Err(AuthError::invalid_request("request object is expired"));
        }

        Ok(())
    }
}

// =============================================================================
// FAPI-CIBA
// =============================================================================

/// FAPI-CIBA rules, applied after the CIBA Core rules.
#[derive(Debug, Clone, Copy)]
pub struct FapiCibaVerifier {
    base: CibaVerifier,
    max_request_object_lifetime: Duration,
}

impl FapiCibaVerifier {
    #[must_use]
    pub fn new(base: CibaVerifier, max_request_object_lifetime: Duration) -> Self {
        Self {
            base,
            max_request_object_lifetime,
        }
    }

    fn max_lifetime_seconds(&self) -> i64 {
        fapi_rules::max_lifetime_seconds(self.max_request_object_lifetime)
    }
}

fn fapi_ciba_violation(violation: FapiClaimViolation) -> AuthError {
    AuthError::invalid_request(format!("FAPI CIBA Profile: {violation}"))
}

impl Default for FapiCibaVerifier {
    fn default() -> Self {
        Self::new(CibaVerifier::default(), Duration::from_secs(60 * 60))
    }
}

impl CibaRequestVerifier for FapiCibaVerifier {
    fn profile(&self) -> CibaProfile {
        CibaProfile::FapiCiba
    }

    fn verify(&self, context: &CibaRequestContext) -> AuthResult<()> {
        self.base.verify(context)?;
        self.verify_signed_request_object(context)?;
        self.verify_iat(context)?;
        self.verify_request_object_lifetime(context)?;
        self.verify_signing_algorithm(context)?;
        self.verify_confidential_client(context)?;
        self.verify_binding_message(context)?;
        self.verify_not_push_mode(context)?;
        self.verify_client_authentication(context)?;
        self.verify_audience(context)?;
        self.verify_sender_constrained_tokens(context)
    }
}

impl FapiCibaVerifier {
    fn verify_signed_request_object(&self, context: &CibaRequestContext) -> AuthResult<()> {
        if !context.is_request_object_pattern() || context.jose().is_none() {
            return Err(AuthError::invalid_request(
                "FAPI CIBA Profile requires signed request object. Request must include 'request' parameter with a signed JWT.",
            ));
        }
        Ok(())
    }

    fn verify_iat(&self, context: &CibaRequestContext) -> AuthResult<()> {
        if context.request_object_claims().and_then(|c| c.iat()).is_none() {
            return Err(AuthError::invalid_request(
                "FAPI CIBA Profile requires 'iat' claim in request object.",
            ));
        }
        Ok(())
    }

    /// `0 < exp - nbf <= max` and `nbf` no older than `max`.
    fn verify_request_object_lifetime(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let claims = context.request_object_claims();
        let max = self.max_lifetime_seconds();
        let lifetime =
            fapi_rules::request_object_lifetime(claims, max).map_err(fapi_ciba_violation)?;
        if lifetime <= 0 {
            return Err(AuthError::invalid_request(
                "FAPI CIBA Profile requires 'exp' to be after 'nbf' in request object.",
            ));
        }
        fapi_rules::verify_not_before_age(claims, context.received_at().unix_timestamp(), max)
            .map_err(fapi_ciba_violation)
    }

    fn verify_signing_algorithm(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let Some(jose) = context.jose().filter(|jose| jose.is_signed()) else {
            return Err(AuthError::invalid_request(
                "FAPI CIBA Profile requires signed request object.",
            ));
        };
        fapi_rules::verify_signing_key(jose).map_err(fapi_ciba_violation)
    }

    fn verify_confidential_client(&self, context: &CibaRequestContext) -> AuthResult<()> {
        if context.client().is_public() {
            return Err(AuthError::invalid_client(
                "FAPI CIBA Profile requires confidential clients. Public clients are not allowed.",
            ));
        }
        Ok(())
    }

    /// `authorization_details` already identifies the transaction.
    fn verify_binding_message(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let request = context.request();
        if !request.has_authorization_details() && request.binding_message.is_none() {
            return Err(AuthError::invalid_request(
                "FAPI CIBA Profile requires 'binding_message' parameter when authorization_details is not present.",
            ));
        }
        Ok(())
    }

    fn verify_not_push_mode(&self, context: &CibaRequestContext) -> AuthResult<()> {
        if context.client().is_push_delivery_mode() {
            return Err(AuthError::invalid_request(
                "FAPI CIBA Profile does not support push mode for token delivery. Use poll or ping mode.",
            ));
        }
        Ok(())
    }

    fn verify_client_authentication(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let method = context.client().token_endpoint_auth_method;
        if !method.is_asymmetric_or_mtls() {
            return Err(AuthError::invalid_client(format!(
                "FAPI CIBA Profile requires client authentication method to be one of: private_key_jwt, tls_client_auth, self_signed_tls_client_auth. Current method: {method}"
            )));
        }
        Ok(())
    }

    fn verify_audience(&self, context: &CibaRequestContext) -> AuthResult<()> {
        fapi_rules::verify_audience(context.request_object_claims(), &context.server().issuer)
            .map_err(fapi_ciba_violation)
    }

    fn verify_sender_constrained_tokens(&self, context: &CibaRequestContext) -> AuthResult<()> {
        if !context.server().tls_client_certificate_bound_access_tokens {
            return Err(AuthError::invalid_request(
                "FAPI CIBA Profile requires sender-constrained access tokens, but server tls_client_certificate_bound_access_tokens is false.",
            ));
        }
        if !context.client().tls_client_certificate_bound_access_tokens {
            return Err(AuthError::invalid_request(
                "FAPI CIBA Profile requires sender-constrained access tokens, but client tls_client_certificate_bound_access_tokens is false.",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Verifiers keyed by profile.
pub struct CibaRequestVerifiers {
    verifiers: HashMap<CibaProfile, Box<dyn CibaRequestVerifier>>,
}

impl CibaRequestVerifiers {
    /// Registers the CIBA and FAPI-CIBA verifiers with the limits of
    /// `config`.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let base = CibaVerifier::new(config.ciba.binding_message_max_length);
        Self {
            verifiers: HashMap::new(),
        }
        .with_verifier(base)
        .with_verifier(FapiCibaVerifier::new(
            base,
            config.authorization.fapi_request_object_max_lifetime,
        ))
    }

    /// Registers a verifier, replacing any previous one for its profile.
    #[must_use]
    pub fn with_verifier(mut self, verifier: impl CibaRequestVerifier + 'static) -> Self {
        self.verifiers.insert(verifier.profile(), Box::new(verifier));
        self
    }

    /// Runs the verifier of the request's profile.
    ///
    /// # Errors
    ///
    /// Returns `unauthorized_client` if no verifier is registered for the
    /// profile, otherwise the verifier's failure.
    pub fn verify(&self, context: &CibaRequestContext) -> AuthResult<()> {
        let profile = context.profile();
        let verifier = self.verifiers.get(&profile).ok_or_else(|| {
            AuthError::bad_request(
                OAuthErrorCode::UnauthorizedClient,
                format!("{profile} is not supported"),
            )
        })?;
        verifier.verify(context)
    }
}

impl Default for CibaRequestVerifiers {
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}

impl std::fmt::Debug for CibaRequestVerifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CibaRequestVerifiers")
            .field("profiles", &self.verifiers.keys().collect::<Vec<_>>())
            .finish()
    }
}
