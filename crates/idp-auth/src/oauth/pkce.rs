//! PKCE (Proof Key for Code Exchange, RFC 7636).
//!
//! The authorization endpoint only records and validates the challenge;
//! [`PkceChallenge::verify`] is used when the code is redeemed.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

// =============================================================================
// Error Types
// =============================================================================

/// PKCE validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PkceError {
    #[error("Invalid code_verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    #[error("Invalid code_verifier characters: must be [A-Za-z0-9-._~]")]
    InvalidVerifierCharacters,

    #[error("Invalid code_challenge format: must be 43-128 characters of [A-Za-z0-9-._~]")]
    InvalidChallengeFormat,

    #[error("Unsupported code_challenge_method: {0}")]
    UnsupportedMethod(String),

    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// `code_challenge_method` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PkceChallengeMethod {
    /// SHA-256 of the verifier, base64url encoded.
    #[default]
    S256,
    /// The verifier itself. Allowed by RFC 7636 but rejected by FAPI.
    Plain,
}

impl PkceChallengeMethod {
    /// Parses a method string.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything but `S256` and
    /// `plain`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PKCE Challenge
// =============================================================================

/// A validated `code_challenge` and its method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    challenge: String,
    method: PkceChallengeMethod,
}

impl PkceChallenge {
    /// Validates a challenge. A missing method means `plain` (RFC 7636
    /// section 4.3).
    ///
    /// # Errors
    ///
    /// Returns an error if the method is unknown or the challenge is not
    /// 43-128 unreserved characters.
    pub fn parse(challenge: &str, method: Option<&str>) -> Result<Self, PkceError> {
        let method = match method {
            Some(method) => PkceChallengeMethod::parse(method)?,
            None => PkceChallengeMethod::Plain,
        };

        if !is_unreserved_43_to_128(challenge) {
            return Err(PkceError::InvalidChallengeFormat);
        }

        Ok(Self {
            challenge: challenge.to_string(),
            method,
        })
    }

    /// Derives the S256 challenge of a verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the verifier is malformed.
    pub fn s256_from_verifier(verifier: &str) -> Result<Self, PkceError> {
        validate_verifier(verifier)?;
        Ok(Self {
            challenge: URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
            method: PkceChallengeMethod::S256,
        })
    }

    /// Checks a `code_verifier` against this challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if the verifier is malformed or does not match.
    pub fn verify(&self, verifier: &str) -> Result<(), PkceError> {
        validate_verifier(verifier)?;
        let computed = match self.method {
            PkceChallengeMethod::S256 => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
            PkceChallengeMethod::Plain => verifier.to_string(),
        };
        if computed == self.challenge {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.challenge
    }

    #[must_use]
    pub fn method(&self) -> PkceChallengeMethod {
        self.method
    }
}

fn validate_verifier(verifier: &str) -> Result<(), PkceError> {
    let len = verifier.len();
    if !(43..=128).contains(&len) {
        return Err(PkceError::InvalidVerifierLength(len));
    }
    if !verifier.chars().all(is_unreserved) {
        return Err(PkceError::InvalidVerifierCharacters);
    }
    Ok(())
}

fn is_unreserved_43_to_128(value: &str) -> bool {
    (43..=128).contains(&value.len()) && value.chars().all(is_unreserved)
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}
