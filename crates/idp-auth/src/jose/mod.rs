//! JOSE (JWS / JWE) processing for request objects and ID token hints.
//!
//! [`JoseHandler::handle`] is the only way to obtain a [`JoseContext`]. It
//! decrypts five-segment tokens, then verifies the inner JWS against the key
//! selected for the token's direction:
//!
//! - `HS*` algorithms use the client secret
//! - tokens whose `iss` is the server issuer use the server JWKS
//! - every other token uses the client JWKS
//!
//! Parsing and signature verification are one step, so a context always
//! reflects a verified (or explicitly permitted unsigned) token.

pub mod claims;
pub mod handler;
pub mod header;
pub mod jwe;
pub mod keys;

pub use claims::{JsonWebTokenClaims, StringOrArray};
pub use handler::{JoseContext, JoseHandler, JoseKeys, JoseType};
pub use header::JoseHeader;
pub use keys::{find_key, key_size_bits};

/// Errors raised while handling a JOSE token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoseError {
    /// The token is not a well-formed compact JWS or JWE.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The `alg` or `enc` header value is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No key is available to verify or decrypt the token.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Signature verification failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Decryption failed.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// An unsigned (`alg=none`) token was presented where it is not allowed.
    #[error("unsigned token is not allowed")]
    UnsignedNotAllowed,
}

impl JoseError {
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    #[must_use]
    pub fn unsupported_algorithm(alg: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm(alg.into())
    }

    #[must_use]
    pub fn key_not_found(message: impl Into<String>) -> Self {
        Self::KeyNotFound(message.into())
    }

    #[must_use]
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature(message.into())
    }

    #[must_use]
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        Self::DecryptionFailed(message.into())
    }
}
