//! PKCE parameter rules (RFC 7636 section 4.3, RFC 9700 section 2.1.1).

use super::AuthorizationRequestExtensionVerifier;
use crate::AuthResult;
use crate::error::OAuthErrorCode;
use crate::oauth::{OAuthRequestContext, PkceChallenge};

/// Applies to requests that send PKCE parameters and to public clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct PkceVerifier;

impl AuthorizationRequestExtensionVerifier for PkceVerifier {
    fn name(&self) -> &'static str {
        "pkce"
    }

    fn should_verify(&self, context: &OAuthRequestContext) -> bool {
        let request = context.request();
        request.code_challenge.is_some()
            || request.code_challenge_method.is_some()
            || context.client().is_public()
    }

    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let request = context.request();

        match (
            request.code_challenge.as_deref(),
            request.code_challenge_method.as_deref(),
        ) {
            (Some(challenge), method) => PkceChallenge::parse(challenge, method)
                .map(|_| ())
                .map_err(|e| context.redirectable(OAuthErrorCode::InvalidRequest, e.to_string())),
            (None, Some(_)) => Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "code_challenge_method requires code_challenge",
            )),
            (None, None) => Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "public clients must use PKCE: code_challenge is required",
            )),
        }
    }
}
