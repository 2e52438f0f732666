//! What a user granted to a client.
//!
//! An [`AuthorizationGrant`] is produced once the user has authenticated and
//! consented, and is later turned into tokens. The code flow builds it from
//! the stored [`AuthorizationRequest`]; CIBA builds it from the backchannel
//! request. Both go through [`AuthorizationGrantBuilder`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::oauth::{AuthorizationDetails, AuthorizationRequest};
use crate::types::{GrantType, Scopes, TenantIdentifier, User};

/// How and when the user authenticated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authentication {
    /// `auth_time`.
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,

    /// `amr` values.
    #[serde(default)]
    pub methods: Vec<String>,

    /// `acr` value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acr: Option<String>,
}

impl Authentication {
    #[must_use]
    pub fn new(time: OffsetDateTime) -> Self {
        Self {
            time,
            methods: Vec::new(),
            acr: None,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    #[must_use]
    pub fn with_acr(mut self, acr: impl Into<String>) -> Self {
        self.acr = Some(acr.into());
        self
    }
}

/// A user's grant to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationGrant {
    pub tenant_id: TenantIdentifier,
    pub user: User,
    pub client_id: String,
    pub grant_type: GrantType,
    pub scopes: Scopes,

    /// OpenID Connect `claims` request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Value>,

    /// `custom_*` request parameters carried into tokens.
    #[serde(default)]
    pub custom_properties: BTreeMap<String, String>,

    #[serde(default)]
    pub authorization_details: AuthorizationDetails,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_definition: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
}

impl AuthorizationGrant {
    /// Builds the code flow grant of an authorization request.
    ///
    /// Malformed `authorization_details` were rejected when the request was
    /// verified; anything unparseable here is dropped.
    #[must_use]
    pub fn from_request(
        request: &AuthorizationRequest,
        user: User,
        authentication: Authentication,
    ) -> Self {
        let mut builder =
            AuthorizationGrantBuilder::new(request.tenant_id.clone(), user, &request.client_id)
                .add_scopes(&request.scopes)
                .add_custom_properties(&request.custom_params)
                .add_authentication(authentication);

        if let Some(claims) = &request.claims {
            builder = builder.add_claims(claims.clone());
        }
        if let Some(details) = request
            .authorization_details
            .as_ref()
            .and_then(|value| AuthorizationDetails::parse(value).ok())
        {
            builder = builder.add_authorization_details(details);
        }
        if let Some(definition) = &request.presentation_definition {
            builder = builder.add_presentation_definition(definition.clone());
        }

        builder.build()
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.user.sub
    }

    #[must_use]
    pub fn has_openid_scope(&self) -> bool {
        self.scopes.has_openid()
    }

    #[must_use]
    pub fn has_authorization_details(&self) -> bool {
        !self.authorization_details.is_empty()
    }

    /// Returns `true` if every scope in `requested` was granted.
    #[must_use]
    pub fn is_granted_scopes(&self, requested: &Scopes) -> bool {
        requested.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Scopes of `requested` that were not granted.
    #[must_use]
    pub fn unauthorized_scopes(&self, requested: &Scopes) -> Scopes {
        requested.filter(|scope| !self.scopes.contains(scope))
    }

    /// Returns `true` if the grant was issued to `client_id`.
    #[must_use]
    pub fn is_granted_to(&self, client_id: &str) -> bool {
        self.client_id == client_id
    }

    /// Replaces the authentication and widens the scopes, e.g. after a
    /// step-up login for the same user and client.
    #[must_use]
    pub fn updated_with(mut self, authentication: Authentication, scopes: &Scopes) -> Self {
        self.authentication = Some(authentication);
        self.scopes.extend(scopes);
        self
    }

    /// Combines a previous consent with a newer grant. Scopes, custom
    /// properties and authorization details accumulate; everything else is
    /// taken from `newer`.
    #[must_use]
    pub fn merge(&self, newer: AuthorizationGrant) -> Self {
        let mut scopes = self.scopes.clone();
        scopes.extend(&newer.scopes);

        let mut custom_properties = self.custom_properties.clone();
        custom_properties.extend(newer.custom_properties);

        let mut authorization_details = self.authorization_details.clone();
        authorization_details.extend(newer.authorization_details);

        Self {
            scopes,
            custom_properties,
            authorization_details,
            ..newer
        }
    }
}

/// Incremental construction of an [`AuthorizationGrant`].
#[derive(Debug, Clone)]
pub struct AuthorizationGrantBuilder {
    grant: AuthorizationGrant,
}

impl AuthorizationGrantBuilder {
    /// Starts an `authorization_code` grant.
    #[must_use]
    pub fn new(tenant_id: TenantIdentifier, user: User, client_id: impl Into<String>) -> Self {
        Self {
            grant: AuthorizationGrant {
                tenant_id,
                user,
                client_id: client_id.into(),
                grant_type: GrantType::AuthorizationCode,
                scopes: Scopes::default(),
                claims: None,
                custom_properties: BTreeMap::new(),
                authorization_details: AuthorizationDetails::default(),
                presentation_definition: None,
                authentication: None,
            },
        }
    }

    #[must_use]
    pub fn grant_type(mut self, grant_type: GrantType) -> Self {
        self.grant.grant_type = grant_type;
        self
    }

    #[must_use]
    pub fn add_scopes(mut self, scopes: &Scopes) -> Self {
        self.grant.scopes.extend(scopes);
        self
    }

    #[must_use]
    pub fn add_claims(mut self, claims: Value) -> Self {
        self.grant.claims = Some(claims);
        self
    }

    #[must_use]
    pub fn add_custom_properties(mut self, properties: &BTreeMap<String, String>) -> Self {
        self.grant
            .custom_properties
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    #[must_use]
    pub fn add_authorization_details(mut self, details: AuthorizationDetails) -> Self {
        self.grant.authorization_details.extend(details);
        self
    }

    #[must_use]
    pub fn add_presentation_definition(mut self, definition: Value) -> Self {
        self.grant.presentation_definition = Some(definition);
        self
    }

    #[must_use]
    pub fn add_authentication(mut self, authentication: Authentication) -> Self {
        self.grant.authentication = Some(authentication);
        self
    }

    #[must_use]
    pub fn build(self) -> AuthorizationGrant {
        self.grant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::oauth::{ContextInput, OAuthRequestParameters, create_normal_context};
    use crate::testing::{CLIENT_ID, client_configuration, now, server_configuration, tenant};
    use serde_json::json;

    fn request(query: &str) -> AuthorizationRequest {
        create_normal_context(
            ContextInput {
                parameters: OAuthRequestParameters::from_query(query),
                server: server_configuration(),
                client: client_configuration(),
                received_at: now(),
            },
            &AuthConfig::default(),
        )
        .unwrap()
        .into_request()
    }

    fn grant(scopes: &str) -> AuthorizationGrant {
        AuthorizationGrantBuilder::new(tenant(), User::new("user-1"), CLIENT_ID)
            .add_scopes(&Scopes::parse(scopes))
            .build()
    }

    #[test]
    fn test_from_request() {
        let request = request(
            "client_id=client-1&response_type=code&scope=openid%20profile\
             &claims=%7B%22userinfo%22%3A%7B%22email%22%3Anull%7D%7D\
             &authorization_details=%5B%7B%22type%22%3A%22payment_initiation%22%7D%5D\
             &custom_channel=web",
        );
        let authentication = Authentication::new(now()).with_method("pwd");

        let grant = AuthorizationGrant::from_request(&request, User::new("user-1"), authentication);

        assert_eq!(grant.tenant_id, tenant());
        assert_eq!(grant.subject(), "user-1");
        assert_eq!(grant.client_id, CLIENT_ID);
        assert_eq!(grant.grant_type, GrantType::AuthorizationCode);
        assert_eq!(grant.scopes.to_string(), "openid profile");
        assert!(grant.has_openid_scope());
        assert_eq!(grant.claims, Some(json!({"userinfo": {"email": null}})));
        assert_eq!(grant.authorization_details.types(), vec!["payment_initiation"]);
        assert_eq!(
            grant.custom_properties.get("custom_channel").map(String::as_str),
            Some("web")
        );
        assert_eq!(grant.authentication.unwrap().methods, vec!["pwd"]);
    }

    #[test]
    fn test_granted_and_unauthorized_scopes() {
        let grant = grant("openid profile");

        assert!(grant.is_granted_scopes(&Scopes::parse("profile")));
        assert!(!grant.is_granted_scopes(&Scopes::parse("profile email")));
        assert_eq!(
            grant.unauthorized_scopes(&Scopes::parse("openid email phone")).to_string(),
            "email phone"
        );
        assert!(grant.is_granted_to(CLIENT_ID));
        assert!(!grant.is_granted_to("client-2"));
    }

    #[test]
    fn test_updated_with() {
        let grant = grant("openid").updated_with(
            Authentication::new(now()).with_acr("urn:mace:incommon:iap:silver"),
            &Scopes::parse("email"),
        );
        assert_eq!(grant.scopes.to_string(), "openid email");
        assert_eq!(
            grant.authentication.unwrap().acr.as_deref(),
            Some("urn:mace:incommon:iap:silver")
        );
    }

    #[test]
    fn test_merge_accumulates_scopes() {
        let previous = grant("openid profile");
        let newer = AuthorizationGrantBuilder::new(tenant(), User::new("user-1"), CLIENT_ID)
            .add_scopes(&Scopes::parse("email"))
            .add_claims(json!({"id_token": {"acr": null}}))
            .build();

        let merged = previous.merge(newer);

        assert_eq!(merged.scopes.to_string(), "openid profile email");
        assert_eq!(merged.claims, Some(json!({"id_token": {"acr": null}})));
    }

    #[test]
    fn test_serde_roundtrip() {
        let grant = AuthorizationGrantBuilder::new(tenant(), User::new("user-1"), CLIENT_ID)
            .grant_type(GrantType::Ciba)
            .add_scopes(&Scopes::parse("openid"))
            .add_authentication(Authentication::new(now()))
            .build();

        let json = serde_json::to_string(&grant).unwrap();
        let parsed: AuthorizationGrant = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, grant);
    }
}
