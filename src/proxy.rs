//! Identity-propagating reverse proxy.
//!
//! Every proxied request loses any inbound identity header. If the caller
//! presents a live session, the session's user is serialized as JSON into
//! that header before the request is sent upstream; otherwise the request
//! goes upstream anonymously. Session problems are never reported to the
//! client on this path.

use std::time::Duration;

use axum::body::Body;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderMap, Request, Response, Uri};
use http_body_util::LengthLimitError;

use crate::session::SessionState;
use crate::{SessionManager, User};

/// Largest request body relayed upstream.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Not relayed in either direction.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid upstream url: {0}")]
    InvalidUpstream(String),
    #[error("failed to encode principal: {0}")]
    Principal(String),
    #[error("failed to read request body: {0}")]
    Body(String),
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("upstream request failed: {0}")]
    Upstream(String),
}

/// Scheme and authority every proxied request is rewritten to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
}

impl Upstream {
    /// Accepts `http://host[:port]` or `https://host[:port]`, optionally with a
    /// trailing `/`. A bare `host:port` is taken as `http`.
    pub fn parse(url: &str) -> Result<Self, ProxyError> {
        let url = if url.contains("://") {
            url.to_owned()
        } else {
            format!("http://{url}")
        };
        let uri: Uri = url
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ProxyError::InvalidUpstream(e.to_string()))?;

        let scheme = match uri.scheme() {
            Some(s) if *s == Scheme::HTTP || *s == Scheme::HTTPS => s.clone(),
            _ => return Err(ProxyError::InvalidUpstream(format!("unsupported scheme in {url}"))),
        };
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| ProxyError::InvalidUpstream(format!("missing host in {url}")))?;
        if !matches!(uri.path(), "" | "/") || uri.query().is_some() {
            return Err(ProxyError::InvalidUpstream(format!(
                "upstream must not carry a path or query: {url}"
            )));
        }

        Ok(Self { scheme, authority })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    fn host_header(&self) -> Result<HeaderValue, ProxyError> {
        HeaderValue::from_str(self.authority.as_str())
            .map_err(|e| ProxyError::InvalidUpstream(e.to_string()))
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// The user profile as it travels in the identity header.
pub fn principal_header(user: &User) -> Result<HeaderValue, ProxyError> {
    let json = serde_json::to_string(user).map_err(|e| ProxyError::Principal(e.to_string()))?;
    HeaderValue::from_str(&json).map_err(|e| ProxyError::Principal(e.to_string()))
}

/// Points `req` at `upstream` and sets or clears the identity header.
///
/// All inbound values of `identity_header` are removed; `identity`, when
/// present, becomes its only value. Scheme, authority and `Host` are
/// overwritten; path and query are kept.
pub fn direct<B>(
    mut req: Request<B>,
    identity: Option<HeaderValue>,
    identity_header: &HeaderName,
    upstream: &Upstream,
) -> Request<B> {
    let headers = req.headers_mut();
    headers.remove(identity_header);
    if let Some(identity) = identity {
        headers.insert(identity_header.clone(), identity);
    }
    if let Ok(host) = upstream.host_header() {
        headers.insert(header::HOST, host);
    }

    let path_and_query = req
        .uri()
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    // scheme, authority and path are all present, so the build cannot fail
    if let Ok(uri) = Uri::builder()
        .scheme(upstream.scheme.clone())
        .authority(upstream.authority.clone())
        .path_and_query(path_and_query)
        .build()
    {
        *req.uri_mut() = uri;
    }

    req
}

/// Authenticates proxied requests and relays them to the upstream service.
#[derive(Clone)]
pub struct IdentityProxy {
    sessions: SessionManager,
    upstream: Upstream,
    identity_header: HeaderName,
    client: reqwest::Client,
}

impl IdentityProxy {
    pub fn new(
        sessions: SessionManager,
        upstream: Upstream,
        identity_header: HeaderName,
    ) -> Result<Self, ProxyError> {
        Ok(Self {
            sessions,
            upstream,
            identity_header,
            client: relay_client(None)?,
        })
    }

    /// Rebuilds the client with a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProxyError> {
        self.client = relay_client(Some(timeout))?;
        Ok(self)
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// The identity header value for the caller, or `None` to go anonymous.
    pub async fn resolve_identity(&self, headers: &HeaderMap, uri: &Uri) -> Option<HeaderValue> {
        let state = match self.sessions.get_state::<SessionState>(headers, uri).await {
            Ok((_, state)) => state,
            Err(e) => {
                if e.is_store_unavailable() {
                    log::warn!(target: "spectrum_gateway::proxy", "msg=\"forwarding anonymously\" reason=\"store unavailable\"");
                }
                log::debug!(target: "spectrum_gateway::proxy", "msg=\"principal attached\" attached=false");
                return None;
            }
        };

        match principal_header(&state.user) {
            Ok(value) => {
                log::debug!(target: "spectrum_gateway::proxy", "msg=\"principal attached\" attached=true");
                Some(value)
            }
            Err(e) => {
                log::warn!(target: "spectrum_gateway::proxy", "msg=\"principal not encodable\" error=\"{e}\"");
                None
            }
        }
    }

    /// Resolves the caller and rewrites `req` for the upstream.
    pub async fn prepare<B>(&self, req: Request<B>) -> Request<B> {
        let identity = self.resolve_identity(req.headers(), req.uri()).await;
        direct(req, identity, &self.identity_header, &self.upstream)
    }

    /// Prepares `req`, sends it upstream and relays the response.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "proxy_forward", skip_all, err)
    )]
    pub async fn forward(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let (parts, body) = self.prepare(req).await.into_parts();
        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(body_error)?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);

        let upstream = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                log::warn!(target: "spectrum_gateway::proxy", "msg=\"upstream request failed\" upstream={} error=\"{e}\"", self.upstream);
                ProxyError::Upstream(e.to_string())
            })?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        let body = upstream
            .bytes()
            .await
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Upstream redirects are relayed to the caller, never followed. The identity
/// header only ever reaches the configured upstream.
fn relay_client(timeout: Option<Duration>) -> Result<reqwest::Client, ProxyError> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| ProxyError::Upstream(e.to_string()))
}

fn body_error(err: axum::Error) -> ProxyError {
    let inner = err.into_inner();
    if inner.is::<LengthLimitError>() {
        ProxyError::BodyTooLarge(MAX_BODY_BYTES)
    } else {
        ProxyError::Body(inner.to_string())
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}
