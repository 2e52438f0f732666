//! `authorization_details` rules (RFC 9396 section 5).

use super::AuthorizationRequestExtensionVerifier;
use crate::AuthResult;
use crate::error::OAuthErrorCode;
use crate::oauth::{AuthorizationDetails, OAuthRequestContext};

/// Applies when `authorization_details` is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationDetailsVerifier;

impl AuthorizationRequestExtensionVerifier for AuthorizationDetailsVerifier {
    fn name(&self) -> &'static str {
        "authorization_details"
    }

    fn should_verify(&self, context: &OAuthRequestContext) -> bool {
        context.request().authorization_details.is_some()
    }

    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let Some(value) = context.request().authorization_details.as_ref() else {
            return Ok(());
        };

        let details = AuthorizationDetails::parse(value)
            .map_err(|message| context.redirectable(OAuthErrorCode::InvalidRequest, message))?;

        for detail_type in details.types() {
            if !context
                .server()
                .is_supported_authorization_details_type(detail_type)
            {
                return Err(context.redirectable(
                    OAuthErrorCode::InvalidRequest,
                    format!("unsupported authorization details type ({detail_type})"),
                ));
            }
            if !context
                .client()
                .authorization_details_types
                .iter()
                .any(|registered| registered == detail_type)
            {
                return Err(context.redirectable(
                    OAuthErrorCode::InvalidRequest,
                    format!("client is not authorized for authorization details type ({detail_type})"),
                ));
            }
        }

        Ok(())
    }
}
