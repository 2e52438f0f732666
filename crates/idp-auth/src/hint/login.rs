//! `login_hint` resolution.
//!
//! Supported formats:
//!
//! - `sub:<subject>`
//! - `phone:<number>[,<provider_id>]`
//! - `email:<address>[,<provider_id>]`
//!
//! Without a provider the default provider is used.

use async_trait::async_trait;

use super::{UserHint, UserHintRelatedParams, UserHintResolver, UserHintType};
use crate::AuthResult;
use crate::storage::UserQueryRepository;
use crate::types::user::DEFAULT_PROVIDER_ID;
use crate::types::{TenantIdentifier, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginHintKind {
    Subject,
    Phone,
    Email,
}

const PREFIXES: [(&str, LoginHintKind); 3] = [
    ("sub:", LoginHintKind::Subject),
    ("phone:", LoginHintKind::Phone),
    ("email:", LoginHintKind::Email),
];

/// A parsed `login_hint`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoginHint<'a> {
    kind: LoginHintKind,
    value: &'a str,
    provider_id: &'a str,
}

fn parse(hint: &str) -> Option<LoginHint<'_>> {
    let (kind, rest) = PREFIXES
        .iter()
        .find_map(|(prefix, kind)| hint.strip_prefix(prefix).map(|rest| (*kind, rest)))?;

    let (value, provider_id) = match rest.split_once(',') {
        Some((value, provider)) if !provider.is_empty() => (value, provider),
        Some((value, _)) => (value, DEFAULT_PROVIDER_ID),
        None => (rest, DEFAULT_PROVIDER_ID),
    };

    (!value.is_empty()).then_some(LoginHint {
        kind,
        value,
        provider_id,
    })
}

/// Resolves `login_hint` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginHintResolver;

#[async_trait]
impl UserHintResolver for LoginHintResolver {
    fn hint_type(&self) -> UserHintType {
        UserHintType::LoginHint
    }

    async fn resolve(
        &self,
        tenant: &TenantIdentifier,
        hint: &UserHint,
        _related: UserHintRelatedParams<'_>,
        users: &dyn UserQueryRepository,
    ) -> AuthResult<Option<User>> {
        let Some(login_hint) = parse(&hint.value) else {
            tracing::debug!(tenant_id = %tenant, "login_hint has no known prefix");
            return Ok(None);
        };

        match login_hint.kind {
            LoginHintKind::Subject => users.get(tenant, login_hint.value).await,
            LoginHintKind::Phone => {
                users
                    .find_by_phone(tenant, login_hint.value, login_hint.provider_id)
                    .await
            }
            LoginHintKind::Email => {
                users
                    .find_by_email(tenant, login_hint.value, login_hint.provider_id)
                    .await
            }
        }
    }
}
