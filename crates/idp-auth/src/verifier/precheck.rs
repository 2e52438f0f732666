//! Structural checks on raw parameters.
//!
//! These run before configuration lookup, so nothing about the client is
//! trusted yet and every failure is returned directly.

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::OAuthRequestParameters;

/// Rejects duplicated parameters (`resource` may repeat, RFC 8707), a
/// missing `client_id`, and `request` sent together with `request_uri`.
///
/// # Errors
///
/// Returns a non-redirectable `invalid_request`.
pub fn precheck(parameters: &OAuthRequestParameters) -> AuthResult<()> {
    let duplicates = parameters.duplicate_keys();
    if !duplicates.is_empty() {
        return Err(AuthError::invalid_request(format!(
            "authorization request must not contain duplicate value; keys ({})",
            duplicates.join(" ")
        )));
    }

    if parameters.client_id().is_none() {
        return Err(AuthError::invalid_request(
            "authorization request must contains client_id",
        ));
    }

    if parameters.request().is_some() && parameters.request_uri().is_some() {
        return Err(AuthError::invalid_request(
            "authorization request must not contain both request and request_uri",
        ));
    }

    Ok(())
}
