//! `response_type`, `response_mode`, `prompt` and `display` values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::server::normalize_space_set;

/// A `response_type` value, independent of the order of its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    None,
    Code,
    Token,
    IdToken,
    CodeToken,
    CodeIdToken,
    IdTokenToken,
    CodeIdTokenToken,
}

impl ResponseType {
    /// Parses a space-delimited value. Returns `None` for unknown
    /// combinations.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match normalize_space_set(value).as_slice() {
            ["none"] => Some(Self::None),
            ["code"] => Some(Self::Code),
            ["token"] => Some(Self::Token),
            ["id_token"] => Some(Self::IdToken),
            ["code", "token"] => Some(Self::CodeToken),
            ["code", "id_token"] => Some(Self::CodeIdToken),
            ["id_token", "token"] => Some(Self::IdTokenToken),
            ["code", "id_token", "token"] => Some(Self::CodeIdTokenToken),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Code => "code",
            Self::Token => "token",
            Self::IdToken => "id_token",
            Self::CodeToken => "code token",
            Self::CodeIdToken => "code id_token",
            Self::IdTokenToken => "id_token token",
            Self::CodeIdTokenToken => "code id_token token",
        }
    }

    #[must_use]
    pub fn contains_code(&self) -> bool {
        matches!(
            self,
            Self::Code | Self::CodeToken | Self::CodeIdToken | Self::CodeIdTokenToken
        )
    }

    #[must_use]
    pub fn contains_id_token(&self) -> bool {
        matches!(
            self,
            Self::IdToken | Self::CodeIdToken | Self::IdTokenToken | Self::CodeIdTokenToken
        )
    }

    #[must_use]
    pub fn contains_token(&self) -> bool {
        matches!(
            self,
            Self::Token | Self::CodeToken | Self::IdTokenToken | Self::CodeIdTokenToken
        )
    }

    /// Implicit and hybrid flows return tokens from the authorization
    /// endpoint.
    #[must_use]
    pub fn is_implicit_or_hybrid(&self) -> bool {
        self.contains_token() || self.contains_id_token()
    }

    /// Default response mode (OAuth 2.0 Multiple Response Type Encoding
    /// Practices): query for `code` and `none`, fragment otherwise.
    #[must_use]
    pub fn default_response_mode(&self) -> ResponseMode {
        match self {
            Self::None | Self::Code => ResponseMode::Query,
            _ => ResponseMode::Fragment,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `response_mode` values, including the JARM modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseMode {
    #[serde(rename = "query")]
    Query,
    #[serde(rename = "fragment")]
    Fragment,
    #[serde(rename = "form_post")]
    FormPost,
    #[serde(rename = "jwt")]
    Jwt,
    #[serde(rename = "query.jwt")]
    QueryJwt,
    #[serde(rename = "fragment.jwt")]
    FragmentJwt,
    #[serde(rename = "form_post.jwt")]
    FormPostJwt,
}

impl ResponseMode {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "fragment" => Some(Self::Fragment),
            "form_post" => Some(Self::FormPost),
            "jwt" => Some(Self::Jwt),
            "query.jwt" => Some(Self::QueryJwt),
            "fragment.jwt" => Some(Self::FragmentJwt),
            "form_post.jwt" => Some(Self::FormPostJwt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Fragment => "fragment",
            Self::FormPost => "form_post",
            Self::Jwt => "jwt",
            Self::QueryJwt => "query.jwt",
            Self::FragmentJwt => "fragment.jwt",
            Self::FormPostJwt => "form_post.jwt",
        }
    }

    /// JWT Secured Authorization Response Mode (JARM).
    #[must_use]
    pub fn is_jwt(&self) -> bool {
        matches!(
            self,
            Self::Jwt | Self::QueryJwt | Self::FragmentJwt | Self::FormPostJwt
        )
    }

    /// Returns `true` if response parameters go into the URI fragment.
    #[must_use]
    pub fn uses_fragment(&self) -> bool {
        matches!(self, Self::Fragment | Self::FragmentJwt)
    }

    /// Returns `true` if response parameters are posted as a form.
    #[must_use]
    pub fn uses_form_post(&self) -> bool {
        matches!(self, Self::FormPost | Self::FormPostJwt)
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `prompt` values (OpenID Connect Core 3.1.2.1, Initiating User
/// Registration 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    None,
    Login,
    Consent,
    SelectAccount,
    Create,
}

impl Prompt {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "login" => Some(Self::Login),
            "consent" => Some(Self::Consent),
            "select_account" => Some(Self::SelectAccount),
            "create" => Some(Self::Create),
            _ => None,
        }
    }
}

/// `display` values (OpenID Connect Core 3.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Page,
    Popup,
    Touch,
    Wap,
}

impl DisplayMode {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "page" => Some(Self::Page),
            "popup" => Some(Self::Popup),
            "touch" => Some(Self::Touch),
            "wap" => Some(Self::Wap),
            _ => None,
        }
    }
}
