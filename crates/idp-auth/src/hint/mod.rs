//! Resolution of the user a backchannel request is about.
//!
//! A CIBA request names its user through exactly one hint. Each hint type
//! has a [`UserHintResolver`]; [`UserHintResolvers`] dispatches on the type.
//! Resolvers return `Ok(None)` when the hint does not identify a user, and
//! the caller turns that into `unknown_user_id`.

pub mod id_token;
pub mod login;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::UserQueryRepository;
use crate::types::{ClientConfiguration, ServerConfiguration, TenantIdentifier, User};

pub use id_token::IdTokenHintResolver;
pub use login::LoginHintResolver;

/// Which hint parameter was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserHintType {
    LoginHint,
    IdTokenHint,
    LoginHintToken,
}

impl UserHintType {
    /// Returns the request parameter name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginHint => "login_hint",
            Self::IdTokenHint => "id_token_hint",
            Self::LoginHintToken => "login_hint_token",
        }
    }
}

impl fmt::Display for UserHintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hint value together with its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHint {
    pub hint_type: UserHintType,
    pub value: String,
}

impl UserHint {
    #[must_use]
    pub fn new(hint_type: UserHintType, value: impl Into<String>) -> Self {
        Self {
            hint_type,
            value: value.into(),
        }
    }
}

/// Configuration a resolver may need to interpret a hint.
#[derive(Debug, Clone, Copy)]
pub struct UserHintRelatedParams<'a> {
    pub server: &'a ServerConfiguration,
    pub client: &'a ClientConfiguration,
}

/// Finds the user one kind of hint refers to.
#[async_trait]
pub trait UserHintResolver: Send + Sync {
    /// The hint type handled by this resolver.
    fn hint_type(&self) -> UserHintType;

    /// Resolves `hint` to a user of `tenant`.
    ///
    /// # Errors
    ///
    /// Only storage failures are errors; an unusable hint is `Ok(None)`.
    async fn resolve(
        &self,
        tenant: &TenantIdentifier,
        hint: &UserHint,
        related: UserHintRelatedParams<'_>,
        users: &dyn UserQueryRepository,
    ) -> AuthResult<Option<User>>;
}

/// `login_hint_token` formats are deployment specific; none is understood
/// yet, so such hints never resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginHintTokenResolver;

#[async_trait]
impl UserHintResolver for LoginHintTokenResolver {
    fn hint_type(&self) -> UserHintType {
        UserHintType::LoginHintToken
    }

    async fn resolve(
        &self,
        tenant: &TenantIdentifier,
        _hint: &UserHint,
        _related: UserHintRelatedParams<'_>,
        _users: &dyn UserQueryRepository,
    ) -> AuthResult<Option<User>> {
        tracing::debug!(tenant_id = %tenant, "login_hint_token is not supported");
        Ok(None)
    }
}

/// Resolvers keyed by hint type.
pub struct UserHintResolvers {
    resolvers: HashMap<UserHintType, Box<dyn UserHintResolver>>,
}

impl UserHintResolvers {
    /// Registers the login hint, ID token hint and login hint token
    /// resolvers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
        .with_resolver(LoginHintResolver)
        .with_resolver(IdTokenHintResolver::new())
        .with_resolver(LoginHintTokenResolver)
    }

    /// Registers a resolver, replacing any previous one for its type.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl UserHintResolver + 'static) -> Self {
        self.resolvers.insert(resolver.hint_type(), Box::new(resolver));
        self
    }

    /// Resolves `hint` with the resolver registered for its type.
    ///
    /// # Errors
    ///
    /// Returns an internal error if no resolver is registered for the type,
    /// and propagates storage failures.
    pub async fn resolve(
        &self,
        tenant: &TenantIdentifier,
        hint: &UserHint,
        related: UserHintRelatedParams<'_>,
        users: &dyn UserQueryRepository,
    ) -> AuthResult<Option<User>> {
        let resolver = self.resolvers.get(&hint.hint_type).ok_or_else(|| {
            AuthError::internal(format!("no resolver for {}", hint.hint_type))
        })?;
        resolver.resolve(tenant, hint, related, users).await
    }
}

impl Default for UserHintResolvers {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UserHintResolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserHintResolvers")
            .field("types", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}
