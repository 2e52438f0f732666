//! Request context handed to the verifier chain.

use time::OffsetDateTime;

use super::{
    AuthorizationProfile, AuthorizationRequest, OAuthRequestParameters, OAuthRequestPattern,
    ResponseMode,
};
use crate::error::{AuthError, OAuthErrorCode, RedirectTarget};
use crate::jose::{JoseContext, JsonWebTokenClaims};
use crate::types::{ClientConfiguration, ServerConfiguration, TenantIdentifier};

/// Everything known about one authorization request.
#[derive(Debug, Clone)]
pub struct OAuthRequestContext {
    pub(crate) parameters: OAuthRequestParameters,
    pub(crate) jose: Option<JoseContext>,
    pub(crate) request: AuthorizationRequest,
    pub(crate) server: ServerConfiguration,
    pub(crate) client: ClientConfiguration,
    pub(crate) received_at: OffsetDateTime,
}

impl OAuthRequestContext {
    #[must_use]
    pub fn tenant(&self) -> &TenantIdentifier {
        &self.request.tenant_id
    }

    #[must_use]
    pub fn pattern(&self) -> OAuthRequestPattern {
        self.request.pattern
    }

    #[must_use]
    pub fn profile(&self) -> AuthorizationProfile {
        self.request.profile
    }

    /// The raw parameters as received.
    #[must_use]
    pub fn parameters(&self) -> &OAuthRequestParameters {
        &self.parameters
    }

    /// The request object, for REQUEST_OBJECT and REQUEST_URI requests.
    #[must_use]
    pub fn jose(&self) -> Option<&JoseContext> {
        self.jose.as_ref()
    }

    #[must_use]
    pub fn request_object_claims(&self) -> Option<&JsonWebTokenClaims> {
        self.jose.as_ref().map(JoseContext::claims)
    }

    #[must_use]
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    #[must_use]
    pub fn server(&self) -> &ServerConfiguration {
        &self.server
    }

    #[must_use]
    pub fn client(&self) -> &ClientConfiguration {
        &self.client
    }

    #[must_use]
    pub fn received_at(&self) -> OffsetDateTime {
        self.received_at
    }

    #[must_use]
    pub fn is_request_parameter_pattern(&self) -> bool {
        self.request.pattern.is_request_parameter()
    }

    /// Consumes the context, returning the request to persist.
    #[must_use]
    pub fn into_request(self) -> AuthorizationRequest {
        self.request
    }

    /// Redirect URI errors are sent to: the requested one, or the only
    /// registered one.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.request
            .redirect_uri
            .as_deref()
            .or_else(|| self.client.single_redirect_uri())
    }

    /// Where a redirectable error is delivered. Only meaningful once the
    /// redirect URI has been validated.
    #[must_use]
    pub fn redirect_target(&self) -> RedirectTarget {
        let response_type = self.request.response_type();
        let default_mode = response_type
            .map(|rt| rt.default_response_mode())
            .unwrap_or(ResponseMode::Query);
        let response_mode = match self.request.response_mode() {
            // Bare `jwt` takes its encoding from the response type.
            Some(ResponseMode::Jwt) if default_mode == ResponseMode::Fragment => {
                ResponseMode::FragmentJwt
            }
            Some(ResponseMode::Jwt) => ResponseMode::QueryJwt,
            Some(mode) => mode,
            None => default_mode,
        };

        RedirectTarget {
            redirect_uri: self.redirect_uri().unwrap_or_default().to_string(),
            state: self.request.state.clone(),
            response_mode,
            issuer: self.server.issuer.clone(),
        }
    }

    /// Builds a redirectable error for this request.
    #[must_use]
    pub fn redirectable(&self, code: OAuthErrorCode, message: impl Into<String>) -> AuthError {
        AuthError::redirectable(code, message, self.redirect_target())
    }
}
