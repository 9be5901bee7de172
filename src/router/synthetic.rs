// Locally built failure responses
// Author: kelexine (https://github.com/kelexine)

use crate::fetch::HttpResponse;
use axum::http::{header, HeaderValue, StatusCode};
use serde_json::json;

/// Returned for API routes when the network is unreachable.
/// 503 Service Unavailable, `application/json`.
pub fn api_unavailable() -> HttpResponse {
    let body = json!({
        "error": "Network error",
        "message": "Unable to connect to server",
    });

    let mut response = HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE, body.to_string());
    response.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Returned for cache-first routes when the network is unreachable and
/// nothing is cached.
pub fn offline_miss() -> HttpResponse {
    let mut response = HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE, "Network error");
    response.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
