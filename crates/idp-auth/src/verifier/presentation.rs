//! `presentation_definition` rules (OpenID for Verifiable Presentations,
//! DIF Presentation Exchange 2.0).

use serde_json::Value;

use super::AuthorizationRequestExtensionVerifier;
use crate::AuthResult;
use crate::error::OAuthErrorCode;
use crate::oauth::OAuthRequestContext;

/// Applies when `presentation_definition` or `presentation_definition_uri`
/// is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentationDefinitionVerifier;

impl AuthorizationRequestExtensionVerifier for PresentationDefinitionVerifier {
    fn name(&self) -> &'static str {
        "presentation_definition"
    }

    fn should_verify(&self, context: &OAuthRequestContext) -> bool {
        let request = context.request();
        request.presentation_definition.is_some() || request.presentation_definition_uri.is_some()
    }

    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let request = context.request();

        let Some(definition) = request.presentation_definition.as_ref() else {
            return Ok(());
        };

        if request.presentation_definition_uri.is_some() {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "presentation_definition and presentation_definition_uri must not be sent together",
            ));
        }

        let Value::Object(definition) = definition else {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "presentation_definition must be a JSON object",
            ));
        };

        if definition
            .get("id")
            .and_then(Value::as_str)
            .is_none_or(str::is_empty)
        {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "presentation_definition must contain id",
            ));
        }

        if !definition
            .get("input_descriptors")
            .is_some_and(Value::is_array)
        {
            return Err(context.redirectable(
                OAuthErrorCode::InvalidRequest,
                "presentation_definition must contain input_descriptors array",
            ));
        }

        Ok(())
    }
}
