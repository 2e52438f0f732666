//! Context creation, one function per request pattern.
//!
//! Each creator is a pure function of the parameters, the verified request
//! object (if any) and the configurations. Request object claims take
//! precedence over query parameters (OpenID Connect Core 6.3.3); when the
//! server requires signed request objects only the claims are used.

use serde_json::Value;
use time::OffsetDateTime;

use super::{
    AuthorizationProfile, AuthorizationRequest, AuthorizationRequestIdentifier,
    OAuthRequestContext, OAuthRequestParameters, OAuthRequestPattern, ParameterSource,
};
use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::{AuthError, OAuthErrorCode};
use crate::jose::{JoseContext, JsonWebTokenClaims};
use crate::types::{ClientConfiguration, Scopes, ServerConfiguration};

/// Inputs shared by all creators.
#[derive(Debug, Clone)]
pub struct ContextInput {
    pub parameters: OAuthRequestParameters,
    pub server: ServerConfiguration,
    pub client: ClientConfiguration,
    pub received_at: OffsetDateTime,
}

/// Creates the context of a plain parameter request.
///
/// # Errors
///
/// Returns `unauthorized_client` if the resolved profile is not enabled on
/// the server.
pub fn create_normal_context(
    input: ContextInput,
    config: &AuthConfig,
) -> AuthResult<OAuthRequestContext> {
    assemble(input, OAuthRequestPattern::Normal, None, config)
}

/// Creates the context of a request carrying a `request` object.
///
/// # Errors
///
/// See [`create_normal_context`].
pub fn create_request_object_context(
    input: ContextInput,
    jose: JoseContext,
    config: &AuthConfig,
) -> AuthResult<OAuthRequestContext> {
    assemble(input, OAuthRequestPattern::RequestObject, Some(jose), config)
}

/// Creates the context of a request whose object was fetched from
/// `request_uri`.
///
/// # Errors
///
/// See [`create_normal_context`].
pub fn create_request_uri_context(
    input: ContextInput,
    jose: JoseContext,
    config: &AuthConfig,
) -> AuthResult<OAuthRequestContext> {
    assemble(input, OAuthRequestPattern::RequestUri, Some(jose), config)
}

/// Query parameters overlaid by request object claims.
pub(crate) struct MergedParameters<'a> {
    parameters: &'a OAuthRequestParameters,
    object: Option<&'a JsonWebTokenClaims>,
    object_only: bool,
}

impl<'a> MergedParameters<'a> {
    pub(crate) fn new(
        parameters: &'a OAuthRequestParameters,
        object: Option<&'a JsonWebTokenClaims>,
        require_signed_request_object: bool,
    ) -> Self {
        Self {
            parameters,
            object,
            object_only: object.is_some() && require_signed_request_object,
        }
    }

    fn query(&self) -> Option<&'a OAuthRequestParameters> {
        (!self.object_only).then_some(self.parameters)
    }

    pub(crate) fn string(&self, key: &str) -> Option<String> {
        self.object
            .and_then(|claims| claims.string(key))
            .or_else(|| self.query().and_then(|params| params.string(key)))
    }

    pub(crate) fn json(&self, key: &str) -> Option<Value> {
        self.object
            .and_then(|claims| ParameterSource::json(claims, key))
            .or_else(|| self.query().and_then(|params| params.json(key)))
    }

    /// `custom_*` parameters; claims override query values.
    pub(crate) fn custom_params(&self) -> std::collections::BTreeMap<String, String> {
        let mut custom = self
            .query()
            .map(OAuthRequestParameters::custom_params)
            .unwrap_or_default();
        if let Some(claims) = self.object {
            for key in claims.as_map().keys() {
                if key.starts_with("custom_")
                    && let Some(value) = claims.string(key)
                {
                    custom.insert(key.clone(), value);
                }
            }
        }
        custom
    }
}

/// Requested scopes the server supports and the client is registered for.
pub(crate) fn filter_scopes(
    requested: &Scopes,
    server: &ServerConfiguration,
    client: &ClientConfiguration,
) -> Scopes {
    let registered = client.scopes();
    requested.filter(|scope| server.is_supported_scope(scope) && registered.contains(scope))
}

/// `now + seconds`, failing on overflow.
pub(crate) fn expires_at(now: OffsetDateTime, seconds: u64) -> AuthResult<OffsetDateTime> {
    i64::try_from(seconds)
        .ok()
        .and_then(|secs| now.checked_add(time::Duration::seconds(secs)))
        .ok_or_else(|| AuthError::configuration(format!("lifetime of {seconds}s overflows")))
}

fn assemble(
    input: ContextInput,
    pattern: OAuthRequestPattern,
    jose: Option<JoseContext>,
    config: &AuthConfig,
) -> AuthResult<OAuthRequestContext> {
    let ContextInput {
        parameters,
        server,
        client,
        received_at,
    } = input;

    let merged = MergedParameters::new(
        &parameters,
        jose.as_ref().map(JoseContext::claims),
        server.require_signed_request_object,
    );

    let requested = merged
        .string("scope")
        .map(|scope| Scopes::parse(&scope))
        .unwrap_or_default();
    let scopes = filter_scopes(&requested, &server, &client);

    let profile = AuthorizationProfile::resolve(&scopes, &server);
    // The redirect URI is not validated yet, so this error is never redirected.
    if !server.supports_profile(profile) {
        tracing::debug!(
            tenant_id = %server.tenant_id,
            client_id = %client.client_id,
            profile = %profile,
            "Profile is not enabled"
        );
        return Err(AuthError::bad_request(
            OAuthErrorCode::UnauthorizedClient,
            format!("{profile} is not supported by this server"),
        ));
    }

    let lifetime = server
        .authorization_request_expires_in
        .unwrap_or_else(|| config.authorization.request_expires_in.as_secs());

    let request = AuthorizationRequest {
        identifier: AuthorizationRequestIdentifier::generate(),
        tenant_id: server.tenant_id.clone(),
        profile,
        pattern,
        client_id: client.client_id.clone(),
        response_type: merged.string("response_type"),
        redirect_uri: merged.string("redirect_uri"),
        scopes,
        state: merged.string("state"),
        nonce: merged.string("nonce"),
        response_mode: merged.string("response_mode"),
        display: merged.string("display"),
        prompt: merged.string("prompt"),
        max_age: merged
            .string("max_age")
            .or_else(|| server.default_max_age.map(|age| age.to_string())),
        ui_locales: merged.string("ui_locales"),
        acr_values: merged.string("acr_values"),
        login_hint: merged.string("login_hint"),
        id_token_hint: merged.string("id_token_hint"),
        claims: merged.json("claims"),
        code_challenge: merged.string("code_challenge"),
        code_challenge_method: merged.string("code_challenge_method"),
        authorization_details: merged.json("authorization_details"),
        presentation_definition: merged.json("presentation_definition"),
        presentation_definition_uri: merged.string("presentation_definition_uri"),
        request: match pattern {
            OAuthRequestPattern::RequestObject => parameters.request().map(ToString::to_string),
            _ => None,
        },
        request_uri: match pattern {
            OAuthRequestPattern::RequestUri => parameters.request_uri().map(ToString::to_string),
            _ => None,
        },
        custom_params: merged.custom_params(),
        created_at: received_at,
        expires_at: expires_at(received_at, lifetime)?,
    };

    Ok(OAuthRequestContext {
        parameters,
        jose,
        request,
        server,
        client,
        received_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::{JoseHandler, JoseKeys};
    use crate::testing::{
        CLIENT_ID, REDIRECT_URI, client_configuration, now, request_object_times,
        server_configuration, sign_ps256,
    };
    use serde_json::json;

    fn input(query: &str) -> ContextInput {
        ContextInput {
            parameters: OAuthRequestParameters::from_query(query),
            server: server_configuration(),
            client: client_configuration(),
            received_at: now(),
        }
    }

    fn verified(claims: Value) -> JoseContext {
        let server = server_configuration();
        let client = client_configuration();
        let token = sign_ps256(&request_object_times(claims));
        JoseHandler::new()
            .handle(&token, &JoseKeys::for_request_object(&server, &client))
            .unwrap()
    }

    #[test]
    fn test_normal_context() {
        let query = format!(
            "client_id={CLIENT_ID}&response_type=code&scope=openid%20profile%20unknown\
             &redirect_uri={REDIRECT_URI}&state=s1&custom_color=blue&prompt=login%20consent"
        );
        let context = create_normal_context(input(&query), &AuthConfig::default()).unwrap();
        let request = context.request();

        assert_eq!(context.pattern(), OAuthRequestPattern::Normal);
        assert_eq!(context.profile(), AuthorizationProfile::Oidc);
        assert_eq!(request.scopes.to_string(), "openid profile");
        assert_eq!(request.state.as_deref(), Some("s1"));
        assert_eq!(request.redirect_uri.as_deref(), Some(REDIRECT_URI));
        assert_eq!(request.prompts().len(), 2);
        assert_eq!(request.custom_params.get("custom_color").map(String::as_str), Some("blue"));
        assert_eq!(request.expires_at, now() + time::Duration::minutes(30));
        assert!(context.jose().is_none());
    }

    #[test]
    fn test_scope_filtered_by_client_registration() {
        let mut input = input("client_id=client-1&scope=openid%20profile");
        input.client.scope = "openid".to_string();
        let context = create_normal_context(input, &AuthConfig::default()).unwrap();
        assert_eq!(context.request().scopes.to_string(), "openid");
    }

    #[test]
    fn test_request_object_claims_take_precedence() {
        let jose = verified(json!({
            "scope": "openid email",
            "state": "from-object",
            "max_age": 600,
            "authorization_details": [{"type": "payment_initiation"}]
        }));
        let context = create_request_object_context(
            input("client_id=client-1&request=x&scope=openid&state=from-query&nonce=n1"),
            jose,
            &AuthConfig::default(),
        )
        .unwrap();
        let request = context.request();

        assert_eq!(request.scopes.to_string(), "openid email");
        assert_eq!(request.state.as_deref(), Some("from-object"));
        // Missing from the object, taken from the query.
        assert_eq!(request.nonce.as_deref(), Some("n1"));
        assert_eq!(request.max_age_seconds(), Some(600));
        assert!(request.authorization_details.as_ref().unwrap().is_array());
        assert_eq!(request.request.as_deref(), Some("x"));
    }

    #[test]
    fn test_require_signed_request_object_ignores_query() {
        let jose = verified(json!({"scope": "openid"}));
        let mut input = input("client_id=client-1&request=x&nonce=from-query");
        input.server.require_signed_request_object = true;
        let context =
            create_request_object_context(input, jose, &AuthConfig::default()).unwrap();
        assert_eq!(context.request().nonce, None);
    }

    #[test]
    fn test_fapi_profile_resolution() {
        let context = create_normal_context(
            input("client_id=client-1&scope=openid%20write"),
            &AuthConfig::default(),
        )
        .unwrap();
        assert_eq!(context.profile(), AuthorizationProfile::FapiAdvanced);

        let context = create_normal_context(
            input("client_id=client-1&scope=openid%20read"),
            &AuthConfig::default(),
        )
        .unwrap();
        assert_eq!(context.profile(), AuthorizationProfile::FapiBaseline);
    }

    #[test]
    fn test_profile_not_enabled() {
        let mut input = input("client_id=client-1&scope=openid%20write");
        input
            .server
            .profiles_supported
            .retain(|p| *p != AuthorizationProfile::FapiAdvanced);
        let err = create_normal_context(input, &AuthConfig::default()).unwrap_err();
        assert_eq!(err.oauth_error_code(), OAuthErrorCode::UnauthorizedClient);
        assert!(!err.is_redirectable());
    }

    #[test]
    fn test_default_max_age_and_lifetime() {
        let mut input = input("client_id=client-1&scope=openid");
        input.server.default_max_age = Some(3600);
        input.server.authorization_request_expires_in = Some(60);
        let context = create_normal_context(input, &AuthConfig::default()).unwrap();
        assert_eq!(context.request().max_age_seconds(), Some(3600));
        assert_eq!(context.request().expires_at, now() + time::Duration::seconds(60));
    }

    #[test]
    fn test_expires_at_overflow() {
        assert!(expires_at(now(), u64::MAX).is_err());
    }
}
