// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, Counter, CounterVec, Encoder, HistogramVec, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // ROUTING METRICS
    // ============================================================================

    /// Routed requests by policy and terminal state
    pub static ref ROUTED_REQUESTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("routed_requests_total", "Total number of intercepted requests"),
        &["policy", "outcome"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // UPSTREAM METRICS
    // ============================================================================

    /// Live fetches against the upstream origin
    pub static ref UPSTREAM_FETCHES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("upstream_fetches_total", "Total live fetches"),
        &["result"], // result: ok, error
        REGISTRY
    ).unwrap();

    /// Live fetch duration
    pub static ref UPSTREAM_FETCH_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("upstream_fetch_duration_seconds", "Live fetch duration in seconds")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["result"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["operation"], // operation: hit, miss, store, store_error, read_error
        REGISTRY
    ).unwrap();

    /// Epochs removed during activation
    pub static ref EPOCHS_DELETED: Counter = register_counter_with_registry!(
        Opts::new("cache_epochs_deleted_total", "Total stale cache epochs deleted"),
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
