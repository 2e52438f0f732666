//! OpenID Connect base rules (OpenID Connect Core 1.0 section 3).

use super::AuthorizationRequestVerifier;
use super::oauth2::{verify_oauth2, verify_redirect_uri};
use crate::AuthResult;
use crate::error::{AuthError, OAuthErrorCode};
use crate::oauth::{AuthorizationProfile, DisplayMode, OAuthRequestContext, Prompt};

/// Base verifier of requests with the `openid` scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct OidcVerifier;

impl AuthorizationRequestVerifier for OidcVerifier {
    fn profile(&self) -> AuthorizationProfile {
        AuthorizationProfile::Oidc
    }

    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        verify_oidc(context)
    }
}

/// The OpenID Connect rules, shared by the FAPI verifiers.
pub(crate) fn verify_oidc(context: &OAuthRequestContext) -> AuthResult<()> {
    verify_redirect_uri(context)?;
    if context.request().redirect_uri.is_none() {
        return Err(AuthError::invalid_request(
            "oidc profile authorization request must contains redirect_uri",
        ));
    }

    verify_oauth2(context)?;
    verify_nonce(context)?;
    verify_display(context)?;
    verify_prompt(context)?;
    verify_max_age(context)
}

fn verify_nonce(context: &OAuthRequestContext) -> AuthResult<()> {
    let request = context.request();
    let implicit_or_hybrid = request
        .response_type()
        .is_some_and(|rt| rt.is_implicit_or_hybrid());

    if implicit_or_hybrid && request.nonce.is_none() {
        return Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            "nonce is required for implicit and hybrid flows",
        ));
    }
    Ok(())
}

fn verify_display(context: &OAuthRequestContext) -> AuthResult<()> {
    match context.request().display.as_deref() {
        Some(display) if DisplayMode::parse(display).is_none() => Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            format!("display is unknown value ({display})"),
        )),
        _ => Ok(()),
    }
}

fn verify_prompt(context: &OAuthRequestContext) -> AuthResult<()> {
    let prompts = context.request().prompts();

    if prompts.iter().any(Option::is_none) {
        return Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            format!(
                "prompt contains unknown value ({})",
                context.request().prompt.as_deref().unwrap_or_default()
            ),
        ));
    }

    if prompts.len() > 1 && prompts.contains(&Some(Prompt::None)) {
        return Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            "prompt none must not be combined with other values",
        ));
    }

    Ok(())
}

fn verify_max_age(context: &OAuthRequestContext) -> AuthResult<()> {
    let request = context.request();
    match request.max_age.as_deref() {
        Some(max_age) if request.max_age_seconds().is_none() => Err(context.redirectable(
            OAuthErrorCode::InvalidRequest,
            format!("max_age must be a non-negative integer ({max_age})"),
        )),
        _ => Ok(()),
    }
}
