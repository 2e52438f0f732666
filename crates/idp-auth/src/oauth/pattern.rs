//! How an authorization request carries its parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::OAuthRequestParameters;
use crate::AuthResult;
use crate::error::AuthError;

/// Wire encoding of the request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OAuthRequestPattern {
    /// Plain query or form parameters.
    Normal,
    /// A JWT passed by value in `request`.
    RequestObject,
    /// A JWT passed by reference in `request_uri`.
    RequestUri,
}

impl OAuthRequestPattern {
    /// Classifies the parameters.
    ///
    /// # Errors
    ///
    /// Returns a non-redirectable `invalid_request` when both `request` and
    /// `request_uri` are present.
    pub fn classify(parameters: &OAuthRequestParameters) -> AuthResult<Self> {
        match (parameters.request(), parameters.request_uri()) {
            (Some(_), Some(_)) => Err(AuthError::invalid_request(
                "request and request_uri must not be used together",
            )),
            (Some(_), None) => Ok(Self::RequestObject),
            (None, Some(_)) => Ok(Self::RequestUri),
            (None, None) => Ok(Self::Normal),
        }
    }

    /// Returns `true` for both JWT carrying patterns.
    #[must_use]
    pub fn is_request_parameter(&self) -> bool {
        matches!(self, Self::RequestObject | Self::RequestUri)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::RequestObject => "REQUEST_OBJECT",
            Self::RequestUri => "REQUEST_URI",
        }
    }
}

impl fmt::Display for OAuthRequestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
