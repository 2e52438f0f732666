//! Request object claim rules (RFC 9101, OpenID Connect Core 6.1).
//!
//! The signature was verified when the context was created; this verifier
//! checks what the claims say.

use super::AuthorizationRequestExtensionVerifier;
use crate::AuthResult;
use crate::error::OAuthErrorCode;
use crate::jose::JoseContext;
use crate::oauth::OAuthRequestContext;

/// Applies to REQUEST_OBJECT and REQUEST_URI requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestObjectVerifier;

impl AuthorizationRequestExtensionVerifier for RequestObjectVerifier {
    fn name(&self) -> &'static str {
        "request_object"
    }

    fn should_verify(&self, context: &OAuthRequestContext) -> bool {
        context.is_request_parameter_pattern() && context.jose().is_some()
    }

    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let Some(jose) = context.jose() else {
            return Ok(());
        };

        verify_signing_key(context, jose)?;
        verify_no_nested_request(context, jose)?;
        verify_issuer(context, jose)?;
        verify_audience(context, jose)?;
        verify_expiration(context, jose)?;
        verify_scope_when_required(context, jose)?;
        verify_client_id(context, jose)
    }
}

fn invalid(context: &OAuthRequestContext, message: impl Into<String>) -> AuthResult<()> {
    Err(context.redirectable(OAuthErrorCode::InvalidRequestObject, message))
}

/// FAPI profiles forbid objects signed with the client secret.
fn verify_signing_key(context: &OAuthRequestContext, jose: &JoseContext) -> AuthResult<()> {
    if context.profile().is_fapi() && jose.is_symmetric() {
        return invalid(
            context,
            "request object is invalid, request object must signed with asymmetric key",
        );
    }
    Ok(())
}

fn verify_no_nested_request(context: &OAuthRequestContext, jose: &JoseContext) -> AuthResult<()> {
    let claims = jose.claims();
    for key in ["request", "request_uri"] {
        if claims.get_string(key).is_some_and(|value| !value.is_empty()) {
            return invalid(
                context,
                format!("request object must not contain {key} parameter (JAR Section 6.2)"),
            );
        }
    }
    Ok(())
}

fn verify_issuer(context: &OAuthRequestContext, jose: &JoseContext) -> AuthResult<()> {
    if jose.is_server_issued() {
        return Ok(());
    }
    match jose.claims().iss() {
        None => invalid(
            context,
            "request object is invalid, must contains iss claim in jwt payload",
        ),
        Some(iss) if !context.client().is_client_id_or_alias(iss) => invalid(
            context,
            "request object is invalid, iss claim must be client_id",
        ),
        Some(_) => Ok(()),
    }
}

fn verify_audience(context: &OAuthRequestContext, jose: &JoseContext) -> AuthResult<()> {
    match jose.claims().aud() {
        None => invalid(
            context,
            "request object is invalid, must contains aud claim in jwt payload",
        ),
        Some(aud) if !aud.contains(&context.server().issuer) => invalid(
            context,
            "request object is invalid, aud claim must be issuer",
        ),
        Some(_) => Ok(()),
    }
}

fn verify_expiration(context: &OAuthRequestContext, jose: &JoseContext) -> AuthResult<()> {
    match jose.claims().exp() {
        None => invalid(
            context,
            "request object is invalid, must contains exp claim in jwt payload",
        ),
        Some(exp) if exp <= context.received_at().unix_timestamp() => {
            invalid(context, "request object is invalid, jwt is expired")
        }
        Some(_) => Ok(()),
    }
}

fn verify_scope_when_required(
    context: &OAuthRequestContext,
    jose: &JoseContext,
) -> AuthResult<()> {
    if !context.server().require_signed_request_object {
        return Ok(());
    }
    if jose
        .claims()
        .get_string("scope")
        .is_none_or(|scope| scope.is_empty())
    {
        return invalid(
            context,
            "request object is invalid, when require_signed_request_object is true, scope must be included in the request object",
        );
    }
    Ok(())
}

/// A `client_id` claim must name the requesting client (RFC 9101 section 5).
fn verify_client_id(context: &OAuthRequestContext, jose: &JoseContext) -> AuthResult<()> {
    match jose.claims().get_string("client_id") {
        Some(client_id) if client_id != context.client().client_id => invalid(
            context,
            format!("request object client_id does not match ({client_id})"),
        ),
        _ => Ok(()),
    }
}
