// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{metrics_handler, oauth_callback_handler, send_user_handler, test_handler};
use super::middleware::{request_id_layers, trace_layer};
use crate::config::{AppConfig, OAUTH_CALLBACK_PATH};
use crate::oauth::{CaptureSlot, CredentialStore};
use crate::sheets::SubmissionSink;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Health check path.
pub const TEST_PATH: &str = "/api/test";

/// Contact submission path.
pub const SEND_USER_PATH: &str = "/api/send_user";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: CredentialStore,
    pub capture: CaptureSlot,
    pub sink: Arc<dyn SubmissionSink>,
}

pub fn create_router(state: AppState) -> Router {
    let static_files =
        ServeDir::new(&state.config.server.static_root).append_index_html_on_directories(true);

    let (set_request_id, propagate_request_id) = request_id_layers();

    let mut app = Router::new()
        .route(TEST_PATH, get(test_handler))
        .route(SEND_USER_PATH, get(send_user_handler))
        .route(OAUTH_CALLBACK_PATH, get(oauth_callback_handler));

    if state.config.metrics.enabled {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.fallback_service(static_files)
        // Only GET routes, bodies are never read
        .layer(tower_http::limit::RequestBodyLimitLayer::new(64 * 1024))
        .layer(trace_layer())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state)
}
