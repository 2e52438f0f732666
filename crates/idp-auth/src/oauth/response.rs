//! Boundary translation of [`AuthError`] into OAuth error responses.

use serde::Serialize;

use crate::error::{AuthError, OAuthErrorCode, RedirectTarget};

/// An OAuth error response, either redirected to the client or returned
/// directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthErrorResponse {
    pub error: OAuthErrorCode,

    pub error_description: String,

    /// Set when the error is delivered through the client's redirect URI.
    #[serde(skip)]
    pub redirect: Option<RedirectTarget>,
}

impl OAuthErrorResponse {
    /// Translates an error, logging it at the level its cause deserves.
    ///
    /// Internal details of server failures are not exposed to the client.
    #[must_use]
    pub fn from_error(error: &AuthError) -> Self {
        let code = error.oauth_error_code();

        let description = match error {
            AuthError::ServerConfigurationNotFound { tenant_id } => {
                tracing::warn!(tenant_id = %tenant_id, "Server configuration not found");
                "unknown tenant".to_string()
            }
            AuthError::ClientConfigurationNotFound { client_id } => {
                tracing::warn!(client_id = %client_id, "Client configuration not found");
                format!("unknown client: {client_id}")
            }
            AuthError::Jose(jose) => {
                tracing::debug!(error = %jose, "Request object rejected");
                jose.to_string()
            }
            AuthError::BadRequest { message, .. }
            | AuthError::Redirectable { message, .. }
            | AuthError::InvalidClient { message }
            | AuthError::InvalidGrant { message } => {
                tracing::debug!(error = %code, "{}", message);
                message.clone()
            }
            AuthError::InvalidTransition { .. }
            | AuthError::Storage { .. }
            | AuthError::Configuration { .. }
            | AuthError::Internal { .. } => {
                tracing::error!(category = ?error.category(), "Request processing failed: {}", error);
                "unexpected error occurred".to_string()
            }
        };

        Self {
            error: code,
            error_description: description,
            redirect: error.redirect_target().cloned(),
        }
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.redirect.is_some()
    }

    /// Response parameters in order: `error`, `error_description`, `state`
    /// and `iss` (RFC 9207).
    #[must_use]
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut parameters = vec![
            ("error", self.error.as_str().to_string()),
            ("error_description", self.error_description.clone()),
        ];
        if let Some(target) = &self.redirect {
            if let Some(state) = &target.state {
                parameters.push(("state", state.clone()));
            }
            parameters.push(("iss", target.issuer.clone()));
        }
        parameters
    }

    /// Builds the redirect URL, encoding the parameters in the query or the
    /// fragment according to the response mode. Returns `None` for direct
    /// errors.
    ///
    /// `form_post` modes fall back to query encoding; an HTTP layer that
    /// supports them renders a form from [`OAuthErrorResponse::parameters`]
    /// instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not a valid URL.
    pub fn redirect_url(&self) -> Option<Result<String, url::ParseError>> {
        let target = self.redirect.as_ref()?;
        Some(self.build_redirect_url(target))
    }

    fn build_redirect_url(&self, target: &RedirectTarget) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(&target.redirect_uri)?;
        if target.response_mode.uses_fragment() {
            let fragment = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.parameters())
                .finish();
            url.set_fragment(Some(&fragment));
        } else {
            url.query_pairs_mut().extend_pairs(self.parameters());
        }
        Ok(url.to_string())
    }
}
