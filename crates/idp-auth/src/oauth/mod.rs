//! Front-channel authorization requests.
//!
//! Raw parameters become an [`OAuthRequestContext`] through one creator per
//! [`OAuthRequestPattern`]; the verifier chain then decides whether the
//! request is accepted. See [`OAuthRequestService`] for the full pipeline.

pub mod context;
pub mod creator;
pub mod gateway;
pub mod parameters;
pub mod pattern;
pub mod pkce;
pub mod profile;
pub mod rar;
pub mod request;
pub mod response;
pub mod response_type;
pub mod service;

pub use context::OAuthRequestContext;
pub use creator::{
    ContextInput, create_normal_context, create_request_object_context, create_request_uri_context,
};
pub use gateway::{HttpRequestObjectGateway, RequestObjectGateway};
pub use parameters::{OAuthRequestParameters, ParameterSource};
pub use pattern::OAuthRequestPattern;
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError};
pub use profile::AuthorizationProfile;
pub use rar::{AuthorizationDetail, AuthorizationDetails};
pub use request::{AuthorizationRequest, AuthorizationRequestIdentifier};
pub use response::OAuthErrorResponse;
pub use response_type::{DisplayMode, Prompt, ResponseMode, ResponseType};
pub use service::{OAuthRequestContextService, OAuthRequestService};
