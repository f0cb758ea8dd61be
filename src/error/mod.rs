// Error types for contact-relay
// Author: kelexine (https://github.com/kelexine)

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client descriptor error: {0}")]
    ClientDescriptor(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Authorization was not completed within {0} seconds")]
    AuthorizationTimeout(u64),

    #[error("OAuth token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("{0}")]
    RequestValidation(String),

    #[error("Spreadsheet append failed: {0}")]
    Sheets(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Process exit code for a fatal error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RelayError::Config(_) | RelayError::ConfigParsing(_) => 2,
            RelayError::ClientDescriptor(_) => 3,
            RelayError::TokenExchange(_) => 4,
            RelayError::AuthorizationTimeout(_) => 5,
            _ => 1,
        }
    }
}

// Submissions are answered in plain text, the frontend splits on newlines
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::RequestValidation(_) => StatusCode::BAD_REQUEST,
            RelayError::TokenRefresh(_) | RelayError::TokenExchange(_) => StatusCode::UNAUTHORIZED,
            RelayError::Sheets(_) | RelayError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match self {
            RelayError::RequestValidation(message) => message,
            other => format!("{}\n", other),
        };

        (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
