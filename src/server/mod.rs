//! Axum-based HTTP(S) server for the contact relay.
//!
//! # Components
//!
//! - `handlers`: the `/api/test`, `/api/send_user`, OAuth callback and metrics endpoints.
//! - `query`: query cleaning and field validation shared by the handlers.
//! - `routes`: router wiring, static file fallback and tower layers.
//! - `dispatcher`: the main loop tying the listener, the refresh tick,
//!   the authorization worker and shutdown together.
//! - `tls`: certificate loading for HTTPS.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod dispatcher;
mod handlers;
mod middleware;
pub mod query;
mod routes;
pub mod tls;

pub use dispatcher::Dispatcher;
pub use routes::{create_router, AppState, SEND_USER_PATH, TEST_PATH};
