// Error types for the offline request router
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache store error: {0}")]
    Store(String),

    #[error("Invalid cache epoch: {0}")]
    InvalidEpoch(String),

    #[error("Precache failed for {url}: {reason}")]
    Precache { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// A propagated fetch failure reaches the client as a gateway error.
impl IntoResponse for OfflineError {
    fn into_response(self) -> Response {
        let (status, error_type) = match self {
            OfflineError::Network(_) => (StatusCode::BAD_GATEWAY, "network_error"),
            OfflineError::Url(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            OfflineError::Config(_) | OfflineError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            OfflineError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "cache_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, OfflineError>;
