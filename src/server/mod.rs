//! Axum-based HTTP front for the offline request router.
//!
//! The server stands where a service worker would: between the client shell
//! and the LebrQ origin. Every request it receives is turned into an
//! intercepted request and routed.
//!
//! # Components
//!
//! - `handlers`: Interception fallback, health and metrics endpoints.
//! - `middleware`: Request ID tracking and the epoch response header.
//! - `routes`: The router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::{HealthResponse, HealthStatus, OUTCOME_HEADER};
pub use middleware::EPOCH_HEADER;
pub use routes::{create_router, AppState, CONTROL_PREFIX};
