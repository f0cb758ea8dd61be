// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // REQUEST METRICS
    // ============================================================================

    /// Total number of HTTP requests by matched route
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("relay_requests_total", "Total number of HTTP requests"),
        &["route", "status_code"],
        REGISTRY
    ).unwrap();

    /// Request handling duration
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("relay_request_duration_seconds", "Request duration in seconds")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["route"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // SUBMISSION METRICS
    // ============================================================================

    /// Contact submissions by validation result
    pub static ref SUBMISSIONS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("relay_submissions_total", "Total contact submissions"),
        &["result"], // result: accepted, warned, rejected
        REGISTRY
    ).unwrap();

    /// Spreadsheet append calls
    pub static ref SHEET_APPENDS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("relay_sheet_appends_total", "Total spreadsheet append calls"),
        &["status"], // status: success, failure, skipped
        REGISTRY
    ).unwrap();

    // ============================================================================
    // OAUTH METRICS
    // ============================================================================

    /// OAuth token refresh events
    pub static ref OAUTH_REFRESHES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("oauth_token_refreshes_total", "Total OAuth token refreshes"),
        &["status"], // status: success, failure
        REGISTRY
    ).unwrap();

    /// OAuth token expiry time
    pub static ref OAUTH_TOKEN_EXPIRY: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("oauth_token_expiry_seconds", "Seconds until OAuth token expiry"),
        &["status"], // status: valid, expired
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
