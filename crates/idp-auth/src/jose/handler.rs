//! Token handling entry point.

use std::str::FromStr;

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use super::keys::{find_key, key_size_bits};
use super::{JoseError, JoseHeader, JsonWebTokenClaims, jwe};
use crate::types::{ClientConfiguration, ServerConfiguration};

/// How the token was protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoseType {
    /// `alg=none`.
    Unsigned,
    /// JWS.
    Signed,
    /// JWE wrapping a JWS.
    EncryptedSigned,
}

/// Key material available for one token.
#[derive(Debug, Clone, Copy)]
pub struct JoseKeys<'a> {
    /// Server issuer; a token with this `iss` is verified with the server JWKS.
    pub issuer: &'a str,
    pub server_jwks: &'a JwkSet,
    pub client_jwks: Option<&'a JwkSet>,
    pub client_secret: Option<&'a str>,
    /// RSA private key for `RSA-OAEP-256`.
    pub decryption_key_pem: Option<&'a str>,
    /// Accept `alg=none`.
    pub allow_unsigned: bool,
}

impl<'a> JoseKeys<'a> {
    /// Keys for a request object sent by `client` to `server`.
    #[must_use]
    pub fn for_request_object(server: &'a ServerConfiguration, client: &'a ClientConfiguration) -> Self {
        Self {
            issuer: &server.issuer,
            server_jwks: &server.jwks,
            client_jwks: client.jwks.as_ref(),
            client_secret: client.client_secret.as_deref(),
            decryption_key_pem: server.decryption_key_pem.as_deref(),
            allow_unsigned: server.is_supported_request_object_alg("none"),
        }
    }

    /// Keys for a token the server issued itself, such as an `id_token_hint`.
    /// Unsigned tokens are never accepted.
    #[must_use]
    pub fn for_server_issued(server: &'a ServerConfiguration, client: &'a ClientConfiguration) -> Self {
        Self {
            allow_unsigned: false,
            ..Self::for_request_object(server, client)
        }
    }
}

/// A parsed and verified token.
///
/// Only [`JoseHandler::handle`] creates values of this type.
#[derive(Debug, Clone)]
pub struct JoseContext {
    header: JoseHeader,
    claims: JsonWebTokenClaims,
    jose_type: JoseType,
    key: Option<Jwk>,
    server_issued: bool,
}

impl JoseContext {
    #[must_use]
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    #[must_use]
    pub fn claims(&self) -> &JsonWebTokenClaims {
        &self.claims
    }

    #[must_use]
    pub fn jose_type(&self) -> JoseType {
        self.jose_type
    }

    /// Signing algorithm of the (inner) JWS.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.header.alg
    }

    /// Returns `true` unless the token is `alg=none`.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.jose_type != JoseType::Unsigned
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.jose_type == JoseType::EncryptedSigned
    }

    /// Signed with the client secret.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.header.is_symmetric()
    }

    /// `iss` equals the server issuer.
    #[must_use]
    pub fn is_server_issued(&self) -> bool {
        self.server_issued
    }

    /// Size of the verification key, for asymmetric signatures.
    #[must_use]
    pub fn key_size_bits(&self) -> Option<usize> {
        self.key.as_ref().and_then(key_size_bits)
    }

    /// The JWK that verified the signature.
    #[must_use]
    pub fn verification_key(&self) -> Option<&Jwk> {
        self.key.as_ref()
    }
}

/// Parses, decrypts and verifies compact JOSE tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoseHandler;

impl JoseHandler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Handles a compact token.
    ///
    /// Five segments are decrypted first and the plaintext handled as a JWS;
    /// three segments are handled as a JWS directly.
    ///
    /// # Errors
    ///
    /// Returns a [`JoseError`] if the token is malformed, uses an unsupported
    /// algorithm, no key matches, decryption fails, the signature does not
    /// verify, or the token is unsigned and `keys.allow_unsigned` is false.
    pub fn handle(&self, token: &str, keys: &JoseKeys<'_>) -> Result<JoseContext, JoseError> {
        match token.split('.').count() {
            5 => {
                let plaintext = jwe::decrypt(token, keys.client_secret, keys.decryption_key_pem)?;
                let mut context = self.verify_jws(&plaintext, keys)?;
                if context.jose_type == JoseType::Unsigned {
                    return Err(JoseError::malformed("JWE payload must be a signed JWT"));
                }
                context.jose_type = JoseType::EncryptedSigned;
                Ok(context)
            }
            3 => self.verify_jws(token, keys),
            n => Err(JoseError::malformed(format!(
                "expected 3 or 5 segments, got {n}"
            ))),
        }
    }

    fn verify_jws(&self, token: &str, keys: &JoseKeys<'_>) -> Result<JoseContext, JoseError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_segment, payload_segment, signature] = segments.as_slice() else {
            return Err(JoseError::malformed("JWS must have 3 segments"));
        };

        let header = JoseHeader::decode(header_segment)?;
        let unverified = JsonWebTokenClaims::decode(payload_segment)?;
        let server_issued = unverified.iss() == Some(keys.issuer);

        if header.is_unsigned() {
            if !signature.is_empty() {
                return Err(JoseError::malformed("unsigned JWT must have an empty signature"));
            }
            if !keys.allow_unsigned {
                return Err(JoseError::UnsignedNotAllowed);
            }
            return Ok(JoseContext {
                header,
                claims: unverified,
                jose_type: JoseType::Unsigned,
                key: None,
                server_issued,
            });
        }

        let algorithm = Algorithm::from_str(&header.alg)
            .map_err(|_| JoseError::unsupported_algorithm(header.alg.clone()))?;

        let (decoding_key, jwk) = if header.is_symmetric() {
            let secret = keys
                .client_secret
                .ok_or_else(|| JoseError::key_not_found("client secret is not registered"))?;
            (DecodingKey::from_secret(secret.as_bytes()), None)
        } else {
            let jwks = if server_issued {
                Some(keys.server_jwks)
            } else {
                keys.client_jwks
            }
            .ok_or_else(|| JoseError::key_not_found("client JWKS is not registered"))?;

            let jwk = find_key(jwks, header.kid.as_deref(), algorithm).ok_or_else(|| {
                match header.kid.as_deref() {
                    Some(kid) => JoseError::key_not_found(format!("key '{kid}' not found in JWKS")),
                    None => JoseError::key_not_found("no suitable key found in JWKS"),
                }
            })?;
            let key = DecodingKey::from_jwk(jwk)
                .map_err(|e| JoseError::key_not_found(format!("invalid JWK: {e}")))?;
            (key, Some(jwk.clone()))
        };

        // Claim checks (exp, nbf, aud) belong to the verifiers, which know the
        // profile-specific rules.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<serde_json::Value>(token, &decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(alg = %header.alg, kid = ?header.kid, "JWS verification failed: {}", e);
                JoseError::invalid_signature(e.to_string())
            })?;

        Ok(JoseContext {
            header,
            claims: JsonWebTokenClaims::from_value(data.claims)?,
            jose_type: JoseType::Signed,
            key: jwk,
            server_issued,
        })
    }
}
