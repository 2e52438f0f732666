//! Request object rules shared by FAPI 1.0 Advanced and FAPI-CIBA.
//!
//! The checks return a [`FapiClaimViolation`]; each profile maps it to its
//! own error code and redirectability.

use std::fmt;
use std::time::Duration;

use crate::jose::{JoseContext, JsonWebTokenClaims};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FapiClaimViolation {
    MissingClaim(&'static str),
    LifetimeTooLong { lifetime: i64, max: i64 },
    NotBeforeTooOld { age: i64, max: i64 },
    AudienceMismatch { issuer: String, actual: String },
    UnsupportedAlgorithm(String),
    KeyTooSmall {
        algorithm: String,
        min: usize,
        actual: usize,
    },
}

impl fmt::Display for FapiClaimViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingClaim(claim) => {
                write!(f, "request object must contain an {claim} claim")
            }
            Self::LifetimeTooLong { lifetime, max } => write!(
                f,
                "request object lifetime must be no longer than {} minutes after nbf ({} minutes)",
                max / 60,
                lifetime / 60
            ),
            Self::NotBeforeTooOld { age, max } => write!(
                f,
                "request object nbf must be no longer than {} minutes in the past ({} minutes)",
                max / 60,
                age / 60
            ),
            Self::AudienceMismatch { issuer, actual } => write!(
                f,
                "request object aud must be, or contain, the OP's Issuer Identifier URL (expected: {issuer}, actual: {actual})"
            ),
            Self::UnsupportedAlgorithm(algorithm) => write!(
                f,
                "request object must be signed with PS256 or ES256 ({algorithm})"
            ),
            Self::KeyTooSmall {
                algorithm,
                min,
                actual,
            } => write!(
                f,
                "{algorithm} key must be {min} bits or larger ({actual} bits)"
            ),
        }
    }
}

pub(crate) fn max_lifetime_seconds(max: Duration) -> i64 {
    i64::try_from(max.as_secs()).unwrap_or(i64::MAX)
}

/// Requires `exp` and `nbf` and returns `exp - nbf` when it does not exceed
/// `max` seconds.
pub(crate) fn request_object_lifetime(
    claims: Option<&JsonWebTokenClaims>,
    max: i64,
) -> Result<i64, FapiClaimViolation> {
    let exp = claims
        .and_then(|c| c.exp())
        .ok_or(FapiClaimViolation::MissingClaim("exp"))?;
    let nbf = claims
        .and_then(|c| c.nbf())
        .ok_or(FapiClaimViolation::MissingClaim("nbf"))?;

    let lifetime = exp.saturating_sub(nbf);
    if lifetime > max {
        return Err(FapiClaimViolation::LifetimeTooLong { lifetime, max });
    }
    Ok(lifetime)
}

/// `nbf` must not lie more than `max` seconds before `received_at`. A
/// missing `nbf` passes.
pub(crate) fn verify_not_before_age(
    claims: Option<&JsonWebTokenClaims>,
    received_at: i64,
    max: i64,
) -> Result<(), FapiClaimViolation> {
    let Some(nbf) = claims.and_then(|c| c.nbf()) else {
        return Ok(());
    };
    let age = received_at.saturating_sub(nbf);
    if age > max {
        return Err(FapiClaimViolation::NotBeforeTooOld { age, max });
    }
    Ok(())
}

/// `aud` must be, or contain, the issuer.
pub(crate) fn verify_audience(
    claims: Option<&JsonWebTokenClaims>,
    issuer: &str,
) -> Result<(), FapiClaimViolation> {
    let aud = claims
        .and_then(|c| c.aud())
        .ok_or(FapiClaimViolation::MissingClaim("aud"))?;
    if !aud.contains(issuer) {
        return Err(FapiClaimViolation::AudienceMismatch {
            issuer: issuer.to_string(),
            actual: aud.values().join(", "),
        });
    }
    Ok(())
}

/// Minimum key size in bits per allowed algorithm.
fn minimum_key_size(algorithm: &str) -> Option<usize> {
    match algorithm {
        "PS256" => Some(2048),
        "ES256" => Some(160),
        _ => None,
    }
}

/// Only PS256 and ES256 are allowed.
pub(crate) fn verify_signing_algorithm(algorithm: &str) -> Result<(), FapiClaimViolation> {
    minimum_key_size(algorithm)
        .map(|_| ())
        .ok_or_else(|| FapiClaimViolation::UnsupportedAlgorithm(algorithm.to_string()))
}

/// PS256 with an RSA key of at least 2048 bits, or ES256 with a curve of
/// at least 160 bits.
pub(crate) fn verify_signing_key(jose: &JoseContext) -> Result<(), FapiClaimViolation> {
    let algorithm = jose.algorithm();
    let min = minimum_key_size(algorithm)
        .ok_or_else(|| FapiClaimViolation::UnsupportedAlgorithm(algorithm.to_string()))?;

    let actual = jose.key_size_bits().unwrap_or(0);
    if actual < min {
        return Err(FapiClaimViolation::KeyTooSmall {
            algorithm: algorithm.to_string(),
            min,
            actual,
        });
    }
    Ok(())
}
