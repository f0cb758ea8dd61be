// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    REQUESTS_TOTAL,
    REQUEST_DURATION,
    SUBMISSIONS_TOTAL,
    SHEET_APPENDS,
    OAUTH_REFRESHES,
    OAUTH_TOKEN_EXPIRY,
};

/// Helper to record request metrics
pub fn record_request(route: &str, status_code: u16, duration_secs: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[route, &status_code.to_string()])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[route])
        .observe(duration_secs);
}

/// Helper to record submission validation results
pub fn record_submission(result: &str) {
    SUBMISSIONS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_sheet_append(status: &str) {
    SHEET_APPENDS.with_label_values(&[status]).inc();
}

/// Helper to record OAuth metrics
pub fn record_oauth_refresh(success: bool) {
    let status = if success { "success" } else { "failure" };
    OAUTH_REFRESHES.with_label_values(&[status]).inc();
}

pub fn update_oauth_expiry(seconds: i64) {
    let status = if seconds > 0 { "valid" } else { "expired" };
    OAUTH_TOKEN_EXPIRY.with_label_values(&[status]).set(seconds as f64);
}
