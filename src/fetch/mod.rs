//! Request and response shapes exchanged with the network, and the
//! [`Fetcher`] seam the router performs live fetches through.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod upstream;

pub use upstream::UpstreamClient;

use crate::error::Result;
use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use reqwest::Url;

/// A request intercepted on its way from the client shell to the network.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    /// Absolute URL, resolved against the upstream origin.
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InterceptedRequest {
    /// Body-less request with no headers.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Final URL after redirects. `None` for responses built locally.
    pub url: Option<Url>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// True when the response came back from the same origin as `origin`.
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url
            .as_ref()
            .map(|url| url.origin() == origin.origin())
            .unwrap_or(false)
    }
}

/// Connection-scoped headers that must not be forwarded by a proxy (RFC 9110 §7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Drop hop-by-hop headers, plus `host` and `content-length` which the
/// next hop recomputes.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter().chain(&["host", "content-length"]) {
        headers.remove(*name);
    }
}

/// Performs live network fetches on behalf of the router.
///
/// `Err` means the fetch itself failed (connection refused, timeout, reset).
/// Any HTTP status, including 4xx and 5xx, is a successful fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<HttpResponse>;
}
