// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{health_handler, intercept_handler, metrics_handler};
use super::middleware::{epoch_header_layer, request_id_layers};
use crate::config::AppConfig;
use crate::error::Result;
use crate::router::OfflineRouter;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Paths under this prefix are answered by the router itself.
pub const CONTROL_PREFIX: &str = "/__offline";

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub router: Arc<OfflineRouter>,
}

pub fn create_router(config: AppConfig, router: Arc<OfflineRouter>) -> Result<Router> {
    let epoch_header = epoch_header_layer(router.epochs().current())?;
    let body_limit = config.server.max_body_bytes;

    let state = AppState { config, router };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route(&format!("{}/health", CONTROL_PREFIX), get(health_handler))
        .route(&format!("{}/metrics", CONTROL_PREFIX), get(metrics_handler))
        .fallback(intercept_handler)
        .layer(DefaultBodyLimit::disable())
        .layer(tower_http::limit::RequestBodyLimitLayer::new(body_limit))
        .layer(epoch_header)
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
