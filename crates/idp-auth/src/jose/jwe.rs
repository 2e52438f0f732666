//! Compact JWE decryption.
//!
//! Supported key management algorithms:
//!
//! - `dir` with a content encryption key derived from the client secret
//!   (SHA-256, left-truncated to the `enc` key length, OpenID Connect Core
//!   section 10.2)
//! - `RSA-OAEP-256` with the server's RSA private key
//!
//! Supported content encryption: `A128GCM`, `A256GCM`.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, RsaPrivateKey};
use sha2::{Digest, Sha256};

use super::{JoseError, JoseHeader};

const GCM_IV_LENGTH: usize = 12;
const GCM_TAG_LENGTH: usize = 16;

/// Content encryption algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentEncryption {
    A128Gcm,
    A256Gcm,
}

impl ContentEncryption {
    fn parse(enc: &str) -> Result<Self, JoseError> {
        match enc {
            "A128GCM" => Ok(Self::A128Gcm),
            "A256GCM" => Ok(Self::A256Gcm),
            other => Err(JoseError::unsupported_algorithm(other)),
        }
    }

    fn key_length(self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A256Gcm => 32,
        }
    }
}

/// Decrypts a five-segment compact JWE and returns the plaintext.
///
/// # Errors
///
/// Returns an error if the token is malformed, uses an unsupported
/// algorithm, no key is available or authentication fails.
pub fn decrypt(
    token: &str,
    client_secret: Option<&str>,
    decryption_key_pem: Option<&str>,
) -> Result<String, JoseError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [protected, encrypted_key, iv, ciphertext, tag] = segments.as_slice() else {
        return Err(JoseError::malformed("JWE must have 5 segments"));
    };

    let header = JoseHeader::decode(protected)?;
    let enc = header
        .enc
        .as_deref()
        .ok_or_else(|| JoseError::malformed("JWE header is missing enc"))
        .and_then(ContentEncryption::parse)?;

    let encrypted_key = decode_segment(encrypted_key, "encrypted key")?;
    let cek = match header.alg.as_str() {
        "dir" => {
            if !encrypted_key.is_empty() {
                return Err(JoseError::malformed(
                    "dir key management must not carry an encrypted key",
                ));
            }
            let secret = client_secret
                .ok_or_else(|| JoseError::key_not_found("client secret is not registered"))?;
            derive_key_from_secret(secret, enc.key_length())
        }
        "RSA-OAEP-256" => {
            let pem = decryption_key_pem
                .ok_or_else(|| JoseError::key_not_found("server decryption key is not configured"))?;
            let private_key = parse_rsa_private_key(pem)?;
            private_key
                .decrypt(Oaep::new::<Sha256>(), &encrypted_key)
                .map_err(|e| JoseError::decryption_failed(format!("key unwrap failed: {e}")))?
        }
        other => return Err(JoseError::unsupported_algorithm(other)),
    };

    if cek.len() != enc.key_length() {
        return Err(JoseError::decryption_failed("content encryption key has wrong length"));
    }

    let iv = decode_segment(iv, "initialization vector")?;
    if iv.len() != GCM_IV_LENGTH {
        return Err(JoseError::malformed("initialization vector must be 96 bits"));
    }

    let mut sealed = decode_segment(ciphertext, "ciphertext")?;
    let tag = decode_segment(tag, "authentication tag")?;
    if tag.len() != GCM_TAG_LENGTH {
        return Err(JoseError::malformed("authentication tag must be 128 bits"));
    }
    sealed.extend_from_slice(&tag);

    // AAD is the ASCII of the encoded protected header (RFC 7516 section 5.1).
    let aad = protected.as_bytes();
    let plaintext = match enc {
        ContentEncryption::A128Gcm => open::<Aes128Gcm>(&cek, &iv, aad, &sealed)?,
        ContentEncryption::A256Gcm => open::<Aes256Gcm>(&cek, &iv, aad, &sealed)?,
    };

    String::from_utf8(plaintext).map_err(|_| JoseError::malformed("JWE plaintext is not UTF-8"))
}

/// SHA-256 of the client secret, truncated to `length` bytes.
#[must_use]
pub fn derive_key_from_secret(secret: &str, length: usize) -> Vec<u8> {
    let digest = Sha256::digest(secret.as_bytes());
    digest[..length.min(digest.len())].to_vec()
}

fn open<C: Aead + KeyInit>(
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    sealed: &[u8],
) -> Result<Vec<u8>, JoseError> {
    let cipher = C::new_from_slice(cek)
        .map_err(|_| JoseError::decryption_failed("invalid content encryption key"))?;
    cipher
        .decrypt(GenericArray::from_slice(iv), Payload { msg: sealed, aad })
        .map_err(|_| JoseError::decryption_failed("authentication tag mismatch"))
}

fn parse_rsa_private_key(pem: &str) -> Result<RsaPrivateKey, JoseError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| JoseError::key_not_found("server decryption key is not a valid RSA key"))
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, JoseError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| JoseError::malformed(format!("invalid {what} encoding")))
}
