//! # idp-auth
//!
//! Protocol core of a multi-tenant identity provider.
//!
//! This crate provides:
//! - Authorization request intake for OAuth 2.0, OpenID Connect and FAPI
//! - Request objects (JAR) by value and by reference, signed or encrypted
//! - Rich Authorization Requests, PKCE and presentation definitions
//! - Client Initiated Backchannel Authentication with its grant state
//!   machine, including the FAPI-CIBA profile
//! - User hint resolution for backchannel requests
//!
//! ## Overview
//!
//! Every request goes through the same pipeline: a structural pre-check,
//! pattern classification (plain parameters, `request`, `request_uri`),
//! JOSE processing, context creation and a profile specific verifier
//! chain. Storage and the HTTP surface are supplied by the caller through
//! the traits in [`storage`].
//!
//! ## Modules
//!
//! - [`config`] - Process-level defaults and limits
//! - [`error`] - Error taxonomy and OAuth error codes
//! - [`types`] - Tenants, server and client configuration, users, scopes
//! - [`jose`] - JWS verification and JWE decryption
//! - [`oauth`] - Authorization request parameters, contexts and service
//! - [`verifier`] - Authorization request verifier chain
//! - [`grant`] - Authorization grants
//! - [`ciba`] - Backchannel authentication and CIBA grants
//! - [`hint`] - User hint resolution
//! - [`storage`] - Repository traits

pub mod ciba;
pub mod config;
pub mod error;
pub mod grant;
pub mod hint;
pub mod jose;
pub mod oauth;
pub mod storage;
pub mod types;
pub mod verifier;

#[cfg(test)]
mod testing;

pub use ciba::{
    AuthReqId, BackchannelAuthenticationRequest, BackchannelAuthenticationResponse, CibaGrant,
    CibaGrantService, CibaGrantStatus, CibaProfile, CibaRequestService, SlowDownPolicy,
};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory, OAuthErrorCode, RedirectTarget};
pub use grant::{Authentication, AuthorizationGrant, AuthorizationGrantBuilder};
pub use hint::{UserHint, UserHintResolver, UserHintResolvers, UserHintType};
pub use jose::{JoseContext, JoseError, JoseHandler};
pub use oauth::{
    AuthorizationProfile, AuthorizationRequest, OAuthErrorResponse, OAuthRequestContext,
    OAuthRequestParameters, OAuthRequestPattern, OAuthRequestService,
};
pub use storage::{
    AuthorizationRequestRepository, BackchannelAuthenticationRequestRepository,
    CibaGrantRepository, ClientConfigurationRepository, ServerConfigurationRepository,
    UserQueryRepository,
};
pub use types::{
    ClientConfiguration, GrantType, Scopes, ServerConfiguration, TenantIdentifier, User,
};
pub use verifier::OAuthRequestVerifier;

/// Type alias for protocol results.
pub type AuthResult<T> = Result<T, AuthError>;
