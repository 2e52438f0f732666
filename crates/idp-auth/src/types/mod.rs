//! Domain types shared by the request pipeline and the CIBA state machine.

pub mod client;
pub mod scopes;
pub mod server;
pub mod tenant;
pub mod user;

pub use client::{
    ClientAuthenticationType, ClientConfiguration, ClientValidationError, GrantType,
};
pub use scopes::Scopes;
pub use server::ServerConfiguration;
pub use tenant::TenantIdentifier;
pub use user::User;
