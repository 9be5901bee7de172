//! Structured logging setup.
//!
//! This module configures the `tracing` ecosystem for the application and
//! supports multiple output formats.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{OfflineError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `compact`: Single-line output.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    installed.map_err(|e| OfflineError::Internal(format!("Failed to install logger: {}", e)))
}
