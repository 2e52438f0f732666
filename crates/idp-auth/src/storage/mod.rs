//! Repository traits consumed by the protocol core.
//!
//! This module defines storage interfaces for:
//!
//! - Tenant server configurations and client registrations
//! - Authorization requests awaiting user interaction
//! - Users looked up by login hints
//! - CIBA backchannel requests and grants
//!
//! # Implementations
//!
//! - `idp-auth-memory` - in-memory backend for tests and single-node setups

pub mod authorization_request;
pub mod ciba;
pub mod configuration;
pub mod user;

pub use authorization_request::AuthorizationRequestRepository;
pub use ciba::{BackchannelAuthenticationRequestRepository, CibaGrantRepository};
pub use configuration::{ClientConfigurationRepository, ServerConfigurationRepository};
pub use user::UserQueryRepository;
