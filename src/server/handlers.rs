// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::error::OfflineError;
use crate::epoch::LifecycleState;
use crate::fetch::InterceptedRequest;
use crate::router::Routed;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Reports how the intercepted response was produced.
pub const OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-offline-outcome");

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub epoch: String,
    pub lifecycle: String,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    let epochs = state.router.epochs();
    let lifecycle = epochs.state();

    // Lifecycle: only an activated epoch intercepts requests
    let lifecycle_check = match lifecycle {
        LifecycleState::Activated => HealthCheck {
            status: "ok".to_string(),
            message: "Clients claimed".to_string(),
        },
        LifecycleState::Redundant => {
            overall_status = HealthStatus::Unhealthy;
            HealthCheck {
                status: "error".to_string(),
                message: "Install failed, requests pass straight through".to_string(),
            }
        }
        other => {
            overall_status = HealthStatus::Degraded;
            HealthCheck {
                status: "warning".to_string(),
                message: format!("Not yet active ({})", other.as_str()),
            }
        }
    };
    checks.insert("lifecycle".to_string(), lifecycle_check);

    // Cache store
    let store_check = match state.router.store().len(epochs.current()).await {
        Ok(entries) => HealthCheck {
            status: "ok".to_string(),
            message: format!("{} entries in current epoch", entries),
        },
        Err(e) => {
            if overall_status == HealthStatus::Healthy {
                overall_status = HealthStatus::Degraded;
            }
            HealthCheck {
                status: "warning".to_string(),
                message: e.to_string(),
            }
        }
    };
    checks.insert("cache_store".to_string(), store_check);

    let upstream_check = HealthCheck {
        status: "ok".to_string(),
        message: format!("Origin: {}", state.router.origin()),
    };
    checks.insert("upstream".to_string(), upstream_check);

    Json(HealthResponse {
        status: overall_status,
        epoch: epochs.current().to_string(),
        lifecycle: lifecycle.as_str().to_string(),
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        crate::metrics::gather_metrics(),
    )
}

/// Fallback handler: every request not addressed to the router itself is
/// intercepted and routed.
pub async fn intercept_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, OfflineError> {
    // Rebuild the URL on the upstream origin; never trust the Host header.
    let mut url = state.router.origin().clone();
    url.set_path(uri.path());
    url.set_query(uri.query());

    debug!("Intercepted {} {}", method, url);

    let request = InterceptedRequest {
        method,
        url,
        headers,
        body,
    };

    let routed = state.router.handle(request).await?;
    Ok(into_response(routed))
}

fn into_response(routed: Routed) -> Response {
    let Routed {
        outcome, response, ..
    } = routed;

    let mut res = Response::new(Body::from(response.body));
    *res.status_mut() = response.status;
    *res.headers_mut() = response.headers;
    res.headers_mut()
        .insert(OUTCOME_HEADER, HeaderValue::from_static(outcome.as_str()));
    res
}
