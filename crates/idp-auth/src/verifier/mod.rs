//! Authorization request verification.
//!
//! A request passes through three stages, in a fixed order:
//!
//! 1. [`precheck`] on the raw parameters, before any context exists
//! 2. the base verifier registered for the request's profile
//! 3. every extension verifier whose [`should_verify`] accepts the request,
//!    in registration order
//!
//! The first failure aborts the chain.
//!
//! [`should_verify`]: AuthorizationRequestExtensionVerifier::should_verify

pub mod authorization_details;
pub mod fapi;
pub(crate) mod fapi_rules;
pub mod oauth2;
pub mod oidc;
pub mod pkce;
pub mod precheck;
pub mod presentation;
pub mod request_object;

use std::collections::HashMap;

use crate::AuthResult;
use crate::error::{AuthError, OAuthErrorCode};
use crate::oauth::{AuthorizationProfile, OAuthRequestContext};

pub use authorization_details::AuthorizationDetailsVerifier;
pub use fapi::{FapiAdvancedVerifier, FapiBaselineVerifier};
pub use oauth2::OAuth2Verifier;
pub use oidc::OidcVerifier;
pub use pkce::PkceVerifier;
pub use precheck::precheck;
pub use presentation::PresentationDefinitionVerifier;
pub use request_object::RequestObjectVerifier;

// =============================================================================
// Traits
// =============================================================================

/// Base rules of one authorization profile.
pub trait AuthorizationRequestVerifier: Send + Sync {
    /// The profile these rules apply to.
    fn profile(&self) -> AuthorizationProfile;

    /// Verifies the request.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule, redirectable once the redirect URI
    /// has been validated.
    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()>;
}

/// An additional check applied on top of the base rules.
pub trait AuthorizationRequestExtensionVerifier: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Returns `true` if this verifier applies to the request.
    fn should_verify(&self, context: &OAuthRequestContext) -> bool;

    /// Verifies the request.
    ///
    /// # Errors
    ///
    /// Returns the violated rule.
    fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()>;
}

// =============================================================================
// Registry
// =============================================================================

/// Base verifiers keyed by profile plus the ordered extension list.
pub struct OAuthRequestVerifier {
    base: HashMap<AuthorizationProfile, Box<dyn AuthorizationRequestVerifier>>,
    extensions: Vec<Box<dyn AuthorizationRequestExtensionVerifier>>,
}

impl OAuthRequestVerifier {
    /// A registry without any verifier.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            base: HashMap::new(),
            extensions: Vec::new(),
        }
    }

    /// Registers the OAuth 2.0, OpenID Connect and FAPI base verifiers and
    /// the request object, PKCE, authorization details and presentation
    /// definition extensions.
    ///
    /// `fapi_request_object_max_lifetime` bounds `exp - nbf` and the age of
    /// `nbf` for FAPI Advanced request objects.
    #[must_use]
    pub fn new(fapi_request_object_max_lifetime: std::time::Duration) -> Self {
        Self::empty()
            .with_base(OAuth2Verifier)
            .with_base(OidcVerifier)
            .with_base(FapiBaselineVerifier)
            .with_base(FapiAdvancedVerifier::new(fapi_request_object_max_lifetime))
            .with_extension(RequestObjectVerifier)
            .with_extension(PkceVerifier)
            .with_extension(AuthorizationDetailsVerifier)
            .with_extension(PresentationDefinitionVerifier)
    }

    /// Registers a base verifier, replacing any previous one for its
    /// profile.
    #[must_use]
    pub fn with_base(mut self, verifier: impl AuthorizationRequestVerifier + 'static) -> Self {
        self.base.insert(verifier.profile(), Box::new(verifier));
        self
    }

    /// Appends an extension verifier.
    #[must_use]
    pub fn with_extension(
        mut self,
        verifier: impl AuthorizationRequestExtensionVerifier + 'static,
    ) -> Self {
        self.extensions.push(Box::new(verifier));
        self
    }

    /// Runs the base verifier of the request's profile, then the
    /// applicable extensions.
    ///
    /// # Errors
    ///
    /// Returns `unauthorized_client` if no base verifier is registered for
    /// the profile, otherwise the first failure of the chain.
    pub fn verify(&self, context: &OAuthRequestContext) -> AuthResult<()> {
        let profile = context.profile();
        let base = self.base.get(&profile).ok_or_else(|| {
            AuthError::bad_request(
                OAuthErrorCode::UnauthorizedClient,
                format!("{profile} is not supported"),
            )
        })?;
        base.verify(context)?;

        for extension in &self.extensions {
            if extension.should_verify(context) {
                tracing::trace!(verifier = extension.name(), "Running extension verifier");
                extension.verify(context)?;
            }
        }

        Ok(())
    }
}

impl Default for OAuthRequestVerifier {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(60 * 60))
    }
}

impl std::fmt::Debug for OAuthRequestVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthRequestVerifier")
            .field("base", &self.base.keys().collect::<Vec<_>>())
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
