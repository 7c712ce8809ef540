//! Transparent path-forwarding proxy.
//!
//! Every request under the mount prefix is replayed against
//! `<origin>/<prefix>/<sub-path><query>` with the same method, the inbound
//! headers minus `host` and `content-length`, and (except for GET and HEAD)
//! the full inbound body. The upstream status, headers and body come back
//! unchanged.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, Method},
    response::Response,
    routing::any,
    Router,
};
use bookshelf_kernel::settings::ProxySettings;

use crate::error::AppError;

/// Which inbound headers travel upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Forward everything except `host` and `content-length`.
    StripHostAndLength,
    /// Forward only the listed headers (never `host` or `content-length`).
    AllowList(Vec<HeaderName>),
}

impl HeaderPolicy {
    pub fn from_settings(allowed: Option<&[String]>) -> anyhow::Result<Self> {
        let Some(allowed) = allowed else {
            return Ok(Self::StripHostAndLength);
        };

        let names = allowed
            .iter()
            .map(|name| {
                HeaderName::try_from(name.as_str())
                    .map_err(|err| anyhow::anyhow!("invalid header name '{name}': {err}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::AllowList(names))
    }

    fn forwards(&self, name: &HeaderName) -> bool {
        if name == header::HOST || name == header::CONTENT_LENGTH {
            return false;
        }
        match self {
            HeaderPolicy::StripHostAndLength => true,
            HeaderPolicy::AllowList(allowed) => allowed.contains(name),
        }
    }

    /// Copy the headers this policy lets through.
    pub fn filter(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut outbound = HeaderMap::with_capacity(inbound.len());
        for (name, value) in inbound {
            if self.forwards(name) {
                outbound.append(name.clone(), value.clone());
            }
        }
        outbound
    }
}

#[derive(Debug)]
struct ProxyTarget {
    origin: String,
    prefix: String,
    headers: HeaderPolicy,
}

/// Cheaply cloneable proxy handle shared with the router.
#[derive(Debug, Clone)]
pub struct Proxy {
    client: reqwest::Client,
    target: Arc<ProxyTarget>,
}

impl Proxy {
    pub fn new(
        client: reqwest::Client,
        origin: &str,
        prefix: &str,
        headers: HeaderPolicy,
    ) -> Self {
        Self {
            client,
            target: Arc::new(ProxyTarget {
                origin: origin.trim_end_matches('/').to_string(),
                prefix: prefix.trim_matches('/').to_string(),
                headers,
            }),
        }
    }

    pub fn from_settings(settings: &ProxySettings) -> anyhow::Result<Self> {
        let headers = HeaderPolicy::from_settings(settings.allowed_headers.as_deref())?;
        // Upstream redirects are relayed to the caller, not followed.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self::new(
            client,
            &settings.upstream_origin,
            &settings.prefix,
            headers,
        ))
    }

    pub fn prefix(&self) -> &str {
        &self.target.prefix
    }

    pub fn origin(&self) -> &str {
        &self.target.origin
    }

    /// `<origin>/<prefix>/<sub_path>` followed by `?<query>` when present.
    pub fn upstream_url(&self, sub_path: &str, query: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}/{}",
            self.target.origin,
            self.target.prefix,
            sub_path.trim_start_matches('/')
        );
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Router that forwards every method and every sub-path. Nest it under
    /// `/<prefix>`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(forward))
            .route("/{*path}", any(forward))
            .with_state(self.clone())
    }

    /// Forward one request. `request.uri()` must already be relative to the
    /// mount prefix, as it is inside a nested router.
    pub async fn forward(&self, request: Request) -> Result<Response, AppError> {
        let (parts, body) = request.into_parts();
        let url = self.upstream_url(parts.uri.path(), parts.uri.query());
        let method = parts.method;
        let headers = self.target.headers.filter(&parts.headers);

        let mut upstream = self.client.request(method.clone(), &url).headers(headers);
        if method != Method::GET && method != Method::HEAD {
            let bytes = axum::body::to_bytes(body, usize::MAX)
                .await
                .map_err(|err| AppError::bad_request(format!("failed to read request body: {err}")))?;
            upstream = upstream.body(bytes);
        }

        let response = upstream.send().await.map_err(|err| {
            tracing::warn!(%method, %url, error = %err, "upstream request failed");
            if err.is_timeout() {
                AppError::gateway_timeout(err.to_string())
            } else {
                AppError::bad_gateway(err.to_string())
            }
        })?;

        let status = response.status();
        let upstream_headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(|err| {
            tracing::warn!(%method, %url, error = %err, "upstream body read failed");
            AppError::bad_gateway(err.to_string())
        })?;

        tracing::debug!(%method, %url, status = status.as_u16(), bytes = bytes.len(), "proxied");

        let mut relayed = Response::new(Body::from(bytes));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = upstream_headers;
        Ok(relayed)
    }
}

async fn forward(State(proxy): State<Proxy>, request: Request) -> Result<Response, AppError> {
    proxy.forward(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn proxy(origin: &str, prefix: &str) -> Proxy {
        Proxy::new(
            reqwest::Client::new(),
            origin,
            prefix,
            HeaderPolicy::StripHostAndLength,
        )
    }

    #[test]
    fn upstream_url_joins_origin_prefix_path_and_query() {
        let proxy = proxy("http://10.0.0.5:8080/", "/api/");
        assert_eq!(
            proxy.upstream_url("/books/search", Some("title=dune&page=1&size=28")),
            "http://10.0.0.5:8080/api/books/search?title=dune&page=1&size=28"
        );
        assert_eq!(
            proxy.upstream_url("/auth/login", None),
            "http://10.0.0.5:8080/api/auth/login"
        );
        assert_eq!(proxy.upstream_url("/", None), "http://10.0.0.5:8080/api/");
    }

    #[test]
    fn encoded_segments_are_not_decoded() {
        let proxy = proxy("http://backend", "api");
        assert_eq!(
            proxy.upstream_url("/books/detail/a%2Fb", Some("q=%20x")),
            "http://backend/api/books/detail/a%2Fb?q=%20x"
        );
    }

    #[test]
    fn default_policy_drops_only_host_and_length() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("front.example"));
        inbound.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        inbound.insert(header::COOKIE, HeaderValue::from_static("refreshToken=r"));
        inbound.append("x-trace", HeaderValue::from_static("a"));
        inbound.append("x-trace", HeaderValue::from_static("b"));

        let outbound = HeaderPolicy::StripHostAndLength.filter(&inbound);

        assert!(outbound.get(header::HOST).is_none());
        assert!(outbound.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(outbound.get(header::AUTHORIZATION).unwrap(), "Bearer t");
        assert_eq!(outbound.get(header::COOKIE).unwrap(), "refreshToken=r");
        assert_eq!(outbound.get_all("x-trace").iter().count(), 2);
    }

    #[test]
    fn allow_list_forwards_only_listed_headers() {
        let allowed = vec!["authorization".to_string(), "host".to_string()];
        let policy = HeaderPolicy::from_settings(Some(allowed.as_slice())).unwrap();

        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("front.example"));
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        inbound.insert(header::COOKIE, HeaderValue::from_static("a=b"));

        let outbound = policy.filter(&inbound);
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound.get(header::AUTHORIZATION).unwrap(), "Bearer t");
    }

    #[test]
    fn invalid_allow_list_entry_is_rejected() {
        let allowed = vec!["bad header".to_string()];
        let err = HeaderPolicy::from_settings(Some(allowed.as_slice())).unwrap_err();
        assert!(err.to_string().contains("bad header"));
    }
}
