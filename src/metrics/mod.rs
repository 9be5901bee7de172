// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics, CACHE_OPERATIONS, EPOCHS_DELETED, ROUTED_REQUESTS, UPSTREAM_FETCHES,
    UPSTREAM_FETCH_DURATION,
};

/// Helper to record the terminal state of a routed request
pub fn record_routed(policy: &str, outcome: &str) {
    ROUTED_REQUESTS.with_label_values(&[policy, outcome]).inc();
}

/// Helper to record a live fetch
pub fn record_upstream_fetch(result: &str, duration_secs: f64) {
    UPSTREAM_FETCHES.with_label_values(&[result]).inc();
    UPSTREAM_FETCH_DURATION
        .with_label_values(&[result])
        .observe(duration_secs);
}

/// Helper to record cache operations (hit, miss, store, store_error, read_error)
pub fn record_cache_operation(operation: &str) {
    CACHE_OPERATIONS.with_label_values(&[operation]).inc();
}

pub fn record_epoch_deleted() {
    EPOCHS_DELETED.inc();
}
