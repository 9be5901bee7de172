//! Configuration data structures for the offline request router.
//!
//! This module defines the schema for the application settings: the listening
//! socket, the upstream LebrQ origin, the cache epoch and routing rules, and
//! logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, body limit).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream origin settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Cache epoch, storage backend and route classification settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8787`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest request body accepted from clients, in bytes.
    /// Default: `10485760` (10 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Settings for the upstream connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Origin of the LebrQ web app and API (scheme, host and optional port).
    /// Responses are only cached when they come back from this origin.
    /// Default: `http://127.0.0.1:3000`
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Whole-request timeout in seconds.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection establishment timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Maximum number of idle connections kept per upstream host.
    /// Default: `16`
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,
}

/// Storage backend for cache epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Entries live in process memory and vanish on restart.
    #[default]
    Memory,
    /// Entries are persisted as JSON files under `cache.directory`.
    Disk,
}

/// Settings for the cache epoch and route classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Identifier of the current cache epoch. Bumping it invalidates every
    /// entry stored under a previous identifier.
    /// Default: `lebrq-v<crate version>`
    #[serde(default = "default_epoch")]
    pub epoch: String,

    /// Where epochs are kept.
    /// Default: `memory`
    #[serde(default)]
    pub backend: StoreBackend,

    /// Root directory for the disk backend.
    /// Default: `~/.lebrq-offline/cache`
    #[serde(default = "default_cache_directory")]
    pub directory: String,

    /// Paths fetched into the epoch at install time.
    /// Default: `["/"]`
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Any path containing this substring is never cached.
    /// Default: `/api/`
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Any path containing one of these substrings always goes to the network.
    #[serde(default = "default_fresh_routes")]
    pub fresh_routes: Vec<String>,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            pool_max_idle_per_host: default_pool_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            epoch: default_epoch(),
            backend: StoreBackend::default(),
            directory: default_cache_directory(),
            precache: default_precache(),
            api_prefix: default_api_prefix(),
            fresh_routes: default_fresh_routes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_origin() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_pool_size() -> usize {
    16
}

fn default_epoch() -> String {
    format!("lebrq-v{}", env!("CARGO_PKG_VERSION"))
}

fn default_cache_directory() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".lebrq-offline")
        .join("cache")
        .to_string_lossy()
        .to_string()
}

fn default_precache() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_api_prefix() -> String {
    "/api/".to_string()
}

fn default_fresh_routes() -> Vec<String> {
    ["/about", "/content", "/venue", "/booking", "/book/", "/rack", "/admin/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
