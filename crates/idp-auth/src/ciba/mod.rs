//! Client Initiated Backchannel Authentication (CIBA).
//!
//! A client asks the server to authenticate a user out of band. The request
//! is validated like a front-channel one (pre-check, pattern, JOSE) but
//! against the CIBA or FAPI-CIBA rules, and produces a pending
//! [`CibaGrant`] identified by an [`AuthReqId`]. The user approves or
//! denies on their authentication device; meanwhile the client polls the
//! token endpoint.

pub mod context;
pub mod factory;
pub mod grant;
pub mod polling;
pub mod request;
pub mod service;
pub mod verifier;

pub use context::{CibaRequestContext, create_ciba_context};
pub use factory::{CibaGrantFactory, CibaGrantPolicy};
pub use grant::{AuthReqId, CibaGrant, CibaGrantStatus};
pub use polling::SlowDownPolicy;
pub use request::{
    BackchannelAuthenticationRequest, BackchannelAuthenticationRequestIdentifier, CibaProfile,
};
pub use service::{
    BackchannelAuthenticationResponse, BackchannelAuthenticationResult, CibaGrantService,
    CibaRequestService,
};
pub use verifier::{CibaRequestVerifier, CibaRequestVerifiers, CibaVerifier, FapiCibaVerifier};
