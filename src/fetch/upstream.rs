// Upstream HTTP client for live fetches
// Author: kelexine (https://github.com/kelexine)

use super::{strip_hop_by_hop, Fetcher, HttpResponse, InterceptedRequest};
use crate::config::UpstreamConfig;
use crate::error::{OfflineError, Result};
use crate::metrics;
use async_trait::async_trait;
use axum::http::header;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Client for the LebrQ origin.
///
/// Never retries: a failed fetch is reported to the router once and the
/// router decides what the caller sees.
#[derive(Clone)]
pub struct UpstreamClient {
    http_client: Client,
}

impl UpstreamClient {
    /// Build a pooled HTTP client from the upstream settings.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| OfflineError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created upstream HTTP client with connection pooling");

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Fetcher for UpstreamClient {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<HttpResponse> {
        let started = Instant::now();

        let mut headers = request.headers.clone();
        strip_hop_by_hop(&mut headers);
        // Bodies are stored and replayed to other clients, so ask for identity.
        headers.remove(header::ACCEPT_ENCODING);

        let sent = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!("Upstream fetch {} {} failed: {}", request.method, request.url, e);
                metrics::record_upstream_fetch("error", started.elapsed().as_secs_f64());
                return Err(OfflineError::Network(e.to_string()));
            }
        };

        let status = response.status();
        let url = response.url().clone();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let body = response.bytes().await.map_err(|e| {
            warn!("Upstream body for {} could not be read: {}", url, e);
            metrics::record_upstream_fetch("error", started.elapsed().as_secs_f64());
            OfflineError::Network(e.to_string())
        })?;

        debug!(
            "Fetched {} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );
        metrics::record_upstream_fetch("ok", started.elapsed().as_secs_f64());

        Ok(HttpResponse {
            status,
            headers,
            body,
            url: Some(url),
        })
    }
}
