//! JWK selection.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::Algorithm;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, PublicKeyUse};

/// Finds a signature key in a JWKS by kid and algorithm.
///
/// A key matches when its `kid` equals `kid` (if given), its `alg` equals
/// `algorithm` (if the key declares one) and its `use` is `sig` (if the key
/// declares one).
#[must_use]
pub fn find_key<'a>(jwks: &'a JwkSet, kid: Option<&str>, algorithm: Algorithm) -> Option<&'a Jwk> {
    let alg_str = algorithm_to_string(algorithm);

    jwks.keys.iter().find(|key| {
        if let Some(expected_kid) = kid
            && key.common.key_id.as_deref() != Some(expected_kid)
        {
            return false;
        }

        if let Some(ref key_alg) = key.common.key_algorithm
            && key_alg.to_string() != alg_str
        {
            return false;
        }

        if let Some(ref use_) = key.common.public_key_use
            && *use_ != PublicKeyUse::Signature
        {
            return false;
        }

        key_family_matches(key, algorithm)
    })
}

/// Key size in bits: the RSA modulus length or the EC curve size.
#[must_use]
pub fn key_size_bits(jwk: &Jwk) -> Option<usize> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let modulus = URL_SAFE_NO_PAD.decode(&rsa.n).ok()?;
            let significant = modulus.iter().skip_while(|b| **b == 0).count();
            Some(significant * 8)
        }
        AlgorithmParameters::EllipticCurve(ec) => match ec.curve {
            EllipticCurve::P256 => Some(256),
            EllipticCurve::P384 => Some(384),
            EllipticCurve::P521 => Some(521),
            _ => None,
        },
        _ => None,
    }
}

fn key_family_matches(key: &Jwk, algorithm: Algorithm) -> bool {
    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => matches!(key.algorithm, AlgorithmParameters::RSA(_)),
        Algorithm::ES256 | Algorithm::ES384 => {
            matches!(key.algorithm, AlgorithmParameters::EllipticCurve(_))
        }
        Algorithm::EdDSA => matches!(key.algorithm, AlgorithmParameters::OctetKeyPair(_)),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            matches!(key.algorithm, AlgorithmParameters::OctetKey(_))
        }
    }
}

/// Converts a jsonwebtoken Algorithm to its string representation.
pub(crate) fn algorithm_to_string(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::HS256 => "HS256",
        Algorithm::HS384 => "HS384",
        Algorithm::HS512 => "HS512",
        Algorithm::ES256 => "ES256",
        Algorithm::ES384 => "ES384",
        Algorithm::RS256 => "RS256",
        Algorithm::RS384 => "RS384",
        Algorithm::RS512 => "RS512",
        Algorithm::PS256 => "PS256",
        Algorithm::PS384 => "PS384",
        Algorithm::PS512 => "PS512",
        Algorithm::EdDSA => "EdDSA",
    }
}
