//! `id_token_hint` resolution.

use async_trait::async_trait;

use super::{UserHint, UserHintRelatedParams, UserHintResolver, UserHintType};
use crate::AuthResult;
use crate::jose::{JoseHandler, JoseKeys};
use crate::storage::UserQueryRepository;
use crate::types::{TenantIdentifier, User};

/// Resolves a previously issued ID token to its subject.
///
/// The token must verify against the server's keys (or the client secret
/// for `HS*`) and carry the server as issuer. Expiry is not checked: an
/// expired ID token still identifies its user.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdTokenHintResolver {
    jose: JoseHandler,
}

impl IdTokenHintResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jose: JoseHandler::new(),
        }
    }
}

#[async_trait]
impl UserHintResolver for IdTokenHintResolver {
    fn hint_type(&self) -> UserHintType {
        UserHintType::IdTokenHint
    }

    async fn resolve(
        &self,
        tenant: &TenantIdentifier,
        hint: &UserHint,
        related: UserHintRelatedParams<'_>,
        users: &dyn UserQueryRepository,
    ) -> AuthResult<Option<User>> {
        let keys = JoseKeys::for_server_issued(related.server, related.client);
        let context = match self.jose.handle(&hint.value, &keys) {
            Ok(context) => context,
            Err(e) => {
                tracing::debug!(tenant_id = %tenant, error = %e, "id_token_hint is invalid");
                return Ok(None);
            }
        };

        if !context.is_server_issued() {
            tracing::debug!(tenant_id = %tenant, "id_token_hint was not issued by this server");
            return Ok(None);
        }

        match context.claims().sub() {
            Some(sub) => users.get(tenant, sub).await,
            None => Ok(None),
        }
    }
}
