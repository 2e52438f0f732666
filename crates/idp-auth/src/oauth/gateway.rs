//! `request_uri` dereferencing.
//!
//! The URL is supplied by the client, so the HTTP gateway only talks to
//! public addresses. The host is resolved up front, every resolved address
//! is checked, and the connection is pinned to the checked addresses so a
//! second lookup cannot swap in an internal one. Redirects are not followed.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use url::{Host, Url};

use crate::AuthResult;
use crate::config::RequestUriConfig;
use crate::error::{AuthError, OAuthErrorCode};

/// Fetches the request object referenced by `request_uri`.
#[async_trait]
pub trait RequestObjectGateway: Send + Sync {
    /// Returns the raw request object.
    ///
    /// # Errors
    ///
    /// Returns a non-redirectable `invalid_request_uri` if the object cannot
    /// be retrieved.
    async fn get(&self, request_uri: &str) -> AuthResult<String>;
}

/// Fetches request objects over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpRequestObjectGateway {
    config: RequestUriConfig,
}

impl HttpRequestObjectGateway {
    /// Creates a gateway.
    pub fn new(config: RequestUriConfig) -> Self {
        Self { config }
    }

    fn is_bypassed(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        self.config
            .bypass_hosts
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(host))
    }

    /// Resolves the URL host and rejects non-public addresses unless the host
    /// is in the bypass list.
    async fn resolve(&self, url: &Url) -> AuthResult<Vec<SocketAddr>> {
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid_request_uri("request_uri has no port"))?;

        let addrs: Vec<SocketAddr> = match url.host() {
            Some(Host::Ipv4(ip)) => vec![SocketAddr::new(IpAddr::V4(ip), port)],
            Some(Host::Ipv6(ip)) => vec![SocketAddr::new(IpAddr::V6(ip), port)],
            Some(Host::Domain(domain)) => tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| {
                    tracing::warn!(host = %domain, "request_uri host lookup failed: {}", e);
                    invalid_request_uri("request_uri host could not be resolved")
                })?
                .collect(),
            None => return Err(invalid_request_uri("request_uri has no host")),
        };

        if addrs.is_empty() {
            return Err(invalid_request_uri("request_uri host could not be resolved"));
        }

        let host = url.host_str().unwrap_or_default();
        if !self.is_bypassed(host)
            && let Some(blocked) = addrs.iter().find(|a| is_non_public(a.ip()))
        {
            tracing::warn!(host = %host, address = %blocked.ip(), "request_uri points at a non-public address");
            return Err(invalid_request_uri(
                "request_uri resolves to a non-public address",
            ));
        }

        Ok(addrs)
    }

    fn client_for(&self, url: &Url, addrs: &[SocketAddr]) -> AuthResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(Host::Domain(domain)) = url.host() {
            builder = builder.resolve_to_addrs(domain, addrs);
        }
        builder
            .build()
            .map_err(|e| AuthError::internal(format!("Failed to create HTTP client: {}", e)))
    }
}

fn invalid_request_uri(message: impl Into<String>) -> AuthError {
    AuthError::bad_request(OAuthErrorCode::InvalidRequestUri, message)
}

/// Loopback, private, link-local, shared, multicast and reserved ranges.
fn is_non_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_non_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_non_public_v4(v4),
            None => {
                v6.is_loopback()
                    || v6.is_unspecified()
                    || v6.is_multicast()
                    || v6.is_unique_local()
                    || v6.is_unicast_link_local()
            }
        },
    }
}

fn is_non_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (64..128).contains(&b))
}

#[async_trait]
impl RequestObjectGateway for HttpRequestObjectGateway {
    async fn get(&self, request_uri: &str) -> AuthResult<String> {
        let url = Url::parse(request_uri)
            .map_err(|_| invalid_request_uri("request_uri is not a valid URL"))?;

        match url.scheme() {
            "https" => {}
            "http" if !self.config.require_https => {}
            "http" => return Err(invalid_request_uri("request_uri must use https")),
            _ => return Err(invalid_request_uri("request_uri must use http(s)")),
        }

        let addrs = self.resolve(&url).await?;
        let client = self.client_for(&url, &addrs)?;

        let mut response = client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "application/oauth-authz-req+jwt, application/jwt",
            )
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch request object: {}", e);
                invalid_request_uri("request_uri could not be retrieved")
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "request_uri fetch failed");
            return Err(invalid_request_uri(format!(
                "request_uri fetch failed with status: {}",
                response.status()
            )));
        }

        let max = self.config.max_response_size;
        if let Some(len) = response.content_length()
            && len > max as u64
        {
            return Err(invalid_request_uri("request object exceeds maximum size"));
        }

        // Content-Length is absent on chunked responses, so the cap is also
        // enforced while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| invalid_request_uri(format!("Failed to read request object: {}", e)))?
        {
            if body.len() + chunk.len() > max {
                return Err(invalid_request_uri("request object exceeds maximum size"));
            }
            body.extend_from_slice(&chunk);
        }

        let object = std::str::from_utf8(&body)
            .map_err(|_| invalid_request_uri("request object is not UTF-8"))?
            .trim();
        if object.is_empty() {
            return Err(invalid_request_uri("request object is empty"));
        }

        Ok(object.to_string())
    }
}
