//! Backchannel request context and its creation.

use time::OffsetDateTime;

use super::{BackchannelAuthenticationRequest, BackchannelAuthenticationRequestIdentifier, CibaProfile};
use crate::AuthResult;
use crate::error::{AuthError, OAuthErrorCode};
use crate::jose::{JoseContext, JsonWebTokenClaims};
use crate::oauth::creator::{MergedParameters, filter_scopes};
use crate::oauth::{
    AuthorizationProfile, ContextInput, OAuthRequestParameters, OAuthRequestPattern,
};
use crate::types::{ClientConfiguration, Scopes, ServerConfiguration, TenantIdentifier};

/// Everything known about one backchannel authentication request.
#[derive(Debug, Clone)]
pub struct CibaRequestContext {
    parameters: OAuthRequestParameters,
    jose: Option<JoseContext>,
    request: BackchannelAuthenticationRequest,
    server: ServerConfiguration,
    client: ClientConfiguration,
    received_at: OffsetDateTime,
}

impl CibaRequestContext {
    #[must_use]
    pub fn tenant(&self) -> &TenantIdentifier {
        &self.request.tenant_id
    }

    #[must_use]
    pub fn pattern(&self) -> OAuthRequestPattern {
        self.request.pattern
    }

    #[must_use]
    pub fn profile(&self) -> CibaProfile {
        self.request.profile
    }

    #[must_use]
    pub fn parameters(&self) -> &OAuthRequestParameters {
        &self.parameters
    }

    #[must_use]
    pub fn jose(&self) -> Option<&JoseContext> {
        self.jose.as_ref()
    }

    #[must_use]
    pub fn request_object_claims(&self) -> Option<&JsonWebTokenClaims> {
        self.jose.as_ref().map(JoseContext::claims)
    }

    #[must_use]
    pub fn request(&self) -> &BackchannelAuthenticationRequest {
        &self.request
    }

    #[must_use]
    pub fn server(&self) -> &ServerConfiguration {
        &self.server
    }

    #[must_use]
    pub fn client(&self) -> &ClientConfiguration {
        &self.client
    }

    #[must_use]
    pub fn received_at(&self) -> OffsetDateTime {
        self.received_at
    }

    #[must_use]
    pub fn is_request_object_pattern(&self) -> bool {
        self.request.pattern == OAuthRequestPattern::RequestObject
    }
}

/// Creates the context of a backchannel request.
///
/// `jose` is the verified request object of a REQUEST_OBJECT request.
///
/// # Errors
///
/// Returns a non-redirectable `invalid_request` for REQUEST_URI requests,
/// which backchannel authentication does not define, and for a
/// REQUEST_OBJECT request without its object.
pub fn create_ciba_context(
    input: ContextInput,
    pattern: OAuthRequestPattern,
    jose: Option<JoseContext>,
) -> AuthResult<CibaRequestContext> {
    match (pattern, &jose) {
        (OAuthRequestPattern::RequestUri, _) => {
            return Err(AuthError::invalid_request(
                "request_uri is not supported for backchannel authentication",
            ));
        }
        (OAuthRequestPattern::RequestObject, None) => {
            return Err(AuthError::invalid_request("request object is missing"));
        }
        _ => {}
    }

    let ContextInput {
        parameters,
        server,
        client,
        received_at,
    } = input;

    if !server.supports_profile(AuthorizationProfile::Ciba) {
        tracing::debug!(
            tenant_id = %server.tenant_id,
            client_id = %client.client_id,
            "CIBA profile is not enabled"
        );
        return Err(AuthError::bad_request(
            OAuthErrorCode::UnauthorizedClient,
            "backchannel authentication is not supported by this server",
        ));
    }

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
    let profile = CibaProfile::resolve(&scopes, &server);

    let request = BackchannelAuthenticationRequest {
        identifier: BackchannelAuthenticationRequestIdentifier::generate(),
        tenant_id: server.tenant_id.clone(),
        profile,
        pattern,
        client_id: client.client_id.clone(),
        scopes,
        client_notification_token: merged.string("client_notification_token"),
        acr_values: merged.string("acr_values"),
        login_hint: merged.string("login_hint"),
        login_hint_token: merged.string("login_hint_token"),
        id_token_hint: merged.string("id_token_hint"),
        binding_message: merged.string("binding_message"),
        user_code: merged.string("user_code"),
        requested_expiry: merged.string("requested_expiry"),
        authorization_details: merged.json("authorization_details"),
        request: match pattern {
            OAuthRequestPattern::RequestObject => parameters.request().map(ToString::to_string),
            _ => None,
        },
        custom_params: merged.custom_params(),
        created_at: received_at,
        expires_at: None,
    };

    Ok(CibaRequestContext {
        parameters,
        jose,
        request,
        server,
        client,
        received_at,
    })
}
