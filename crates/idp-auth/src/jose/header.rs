//! Protected header parsing.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use super::JoseError;

/// The protected header of a JWS or JWE.
///
/// Parsed by hand instead of through `jsonwebtoken::decode_header`, which
/// rejects `alg=none` and JWE algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoseHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
}

impl JoseHeader {
    /// Decodes a base64url header segment.
    ///
    /// # Errors
    ///
    /// Returns `JoseError::Malformed` if the segment is not base64url encoded
    /// JSON with an `alg` member.
    pub fn decode(segment: &str) -> Result<Self, JoseError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| JoseError::malformed("invalid header encoding"))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| JoseError::malformed(format!("invalid header JSON: {e}")))
    }

    /// Returns `true` for `alg=none`.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.alg == "none"
    }

    /// Returns `true` for the HMAC algorithms.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.alg.starts_with("HS")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header() {
        let segment = URL_SAFE_NO_PAD.encode(br#"{"alg":"PS256","kid":"rsa-1","typ":"JWT"}"#);
        let header = JoseHeader::decode(&segment).unwrap();
        assert_eq!(header.alg, "PS256");
        assert_eq!(header.kid.as_deref(), Some("rsa-1"));
        assert!(!header.is_unsigned());
        assert!(!header.is_symmetric());
    }

    #[test]
    fn test_decode_none_header() {
        let segment = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        assert!(JoseHeader::decode(&segment).unwrap().is_unsigned());
    }

    #[test]
    fn test_decode_invalid_header() {
        assert!(matches!(
            JoseHeader::decode("!!!"),
            Err(JoseError::Malformed(_))
        ));
        let segment = URL_SAFE_NO_PAD.encode(br#"{"kid":"x"}"#);
        assert!(matches!(
            JoseHeader::decode(&segment),
            Err(JoseError::Malformed(_))
        ));
    }
}
