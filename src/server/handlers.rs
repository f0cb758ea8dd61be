// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::query::{parse_capture, validate_submission};
use super::routes::AppState;
use crate::oauth::{unix_now, Delivery};
use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, info, warn};

const CAPTURE_ACCEPTED_PAGE: &str = "<html><body><h1>Authentication Successful!</h1>\
    <p>You can close this tab and return to the server.</p></body></html>";

const CAPTURE_IGNORED_PAGE: &str = "<html><body><p>You can close this tab.</p></body></html>";

fn host_of(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
}

fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body.into()).into_response()
}

/// Liveness check for `/api/test`
pub async fn test_handler(headers: HeaderMap) -> Response {
    let started = Instant::now();
    info!(host = host_of(&headers), route = "test", "Serving health check");

    let response = plain(StatusCode::OK, "yes");
    crate::metrics::record_request("test", 200, started.elapsed().as_secs_f64());
    response
}

/// Handler for `/api/send_user?name=<string>&number=<digits>`
pub async fn send_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let started = Instant::now();
    let host = host_of(&headers);

    let response = match validate_submission(query.as_deref()) {
        Ok(valid) => {
            info!(
                host,
                route = "send_user",
                name = %valid.submission.name,
                number = %valid.submission.number,
                short_number = valid.warning.is_some(),
                "Received submission"
            );
            crate::metrics::record_submission(if valid.warning.is_some() {
                "warned"
            } else {
                "accepted"
            });

            let body = valid.body();
            state.sink.submit(valid.submission);
            plain(StatusCode::OK, body)
        }
        Err(e) => {
            warn!(host, route = "send_user", "{}", e.to_string().trim_end());
            crate::metrics::record_submission("rejected");
            e.into_response()
        }
    };

    crate::metrics::record_request(
        "send_user",
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// Redirect target for Google's consent page. Only the first redirect of
/// the process is used.
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Html<&'static str> {
    let started = Instant::now();
    let host = host_of(&headers);
    let capture = parse_capture(query.as_deref());
    let has_code = capture.code.is_some();

    let page = match state.capture.deliver(capture) {
        Delivery::Accepted => {
            info!(
                host,
                route = "oauth_callback",
                has_code,
                "Received authentication response from Google"
            );
            CAPTURE_ACCEPTED_PAGE
        }
        Delivery::AlreadyDelivered | Delivery::NotExpected => {
            debug!(host, route = "oauth_callback", "Ignoring repeated OAuth redirect");
            CAPTURE_IGNORED_PAGE
        }
    };

    crate::metrics::record_request("oauth_callback", 200, started.elapsed().as_secs_f64());
    Html(page)
}

/// Prometheus exposition, mounted only when enabled
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Some((expires_in, _expired)) = state.store.token_info(unix_now()).await {
        crate::metrics::update_oauth_expiry(expires_in);
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}
