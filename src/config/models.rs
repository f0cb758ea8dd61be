//! Configuration data structures for contact-relay.
//!
//! The `[server]` table carries everything the relay needs to listen, reach
//! the spreadsheet and authorize against Google. Keys without a serde default
//! are mandatory: a file missing any of them is rejected before a socket is
//! opened.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the private redirect target Google sends the operator back to.
pub const OAUTH_CALLBACK_PATH: &str = "/oauth2/callback";

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relay settings. Mandatory.
    pub server: ServerConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prometheus exposition settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Settings for the relay server and its Google credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Target spreadsheet identifier.
    pub spreadsheet_id: String,

    /// Path to a Google client descriptor JSON (`installed` or `web` shape).
    #[serde(default)]
    pub google_oauth2_client: Option<String>,

    /// Inline alternative to `google_oauth2_client`.
    #[serde(default)]
    pub google_oauth2_auth_uri: Option<String>,
    #[serde(default)]
    pub google_oauth2_token_uri: Option<String>,
    #[serde(default)]
    pub google_oauth2_client_id: Option<String>,
    #[serde(default)]
    pub google_oauth2_client_secret: Option<String>,

    /// Pre-provisioned refresh token. When non-empty the interactive
    /// consent flow is skipped.
    #[serde(default)]
    pub google_oauth2_token: Option<String>,

    /// PEM certificate chain. Must be given together with `tls_key_path`.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// Address to bind.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Dispatcher tick in milliseconds.
    pub poll_rate: u64,

    /// Operator account, sent to Google as `login_hint`.
    pub email: String,

    /// Directory served for every path outside the API.
    /// Default: `.`
    #[serde(default = "default_static_root")]
    pub static_root: String,

    /// OAuth scope requested during consent.
    #[serde(default = "default_scope")]
    pub oauth_scope: String,

    /// A1 range submissions are appended to.
    /// Default: `Sheet1!A:B`
    #[serde(default = "default_sheet_range")]
    pub sheet_range: String,

    /// Send a PKCE S256 challenge with the authorization request.
    #[serde(default)]
    pub use_pkce: bool,

    /// How long the consent flow waits for the browser redirect.
    /// Default: `600`
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_seconds: u64,

    /// Timeout for token endpoint and spreadsheet calls.
    /// Default: `10`
    #[serde(default = "default_token_timeout")]
    pub token_timeout_seconds: u64,

    /// Consecutive refresh failures before a warning is raised.
    /// Default: `3`
    #[serde(default = "default_refresh_warn_threshold")]
    pub refresh_warn_threshold: u32,
}

// Keep secrets out of `{:?}` output
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("google_oauth2_client", &self.google_oauth2_client)
            .field("google_oauth2_auth_uri", &self.google_oauth2_auth_uri)
            .field("google_oauth2_token_uri", &self.google_oauth2_token_uri)
            .field("google_oauth2_client_id", &self.google_oauth2_client_id)
            .field(
                "google_oauth2_client_secret",
                &self.google_oauth2_client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "google_oauth2_token",
                &self.google_oauth2_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("poll_rate", &self.poll_rate)
            .field("email", &self.email)
            .field("static_root", &self.static_root)
            .field("oauth_scope", &self.oauth_scope)
            .field("sheet_range", &self.sheet_range)
            .field("use_pkce", &self.use_pkce)
            .field("auth_timeout_seconds", &self.auth_timeout_seconds)
            .field("token_timeout_seconds", &self.token_timeout_seconds)
            .field("refresh_warn_threshold", &self.refresh_warn_threshold)
            .finish()
    }
}

/// Where the OAuth2 client identity comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientSource<'a> {
    /// A client descriptor document on disk.
    File(&'a str),
    /// Fields given directly in `[server]`.
    Inline {
        auth_uri: &'a str,
        token_uri: &'a str,
        client_id: &'a str,
        client_secret: &'a str,
    },
}

impl ServerConfig {
    /// Paths to the certificate and key when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (self.tls_cert_path.as_deref(), self.tls_key_path.as_deref()) {
            (Some(cert), Some(key)) if !cert.is_empty() && !key.is_empty() => Some((cert, key)),
            _ => None,
        }
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls_paths().is_some()
    }

    /// The refresh token from config, if one was provisioned.
    pub fn provisioned_refresh_token(&self) -> Option<&str> {
        self.google_oauth2_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Resolves which client descriptor source is configured. A file path
    /// wins over inline fields.
    pub fn client_source(&self) -> Option<ClientSource<'_>> {
        if let Some(path) = non_empty(&self.google_oauth2_client) {
            return Some(ClientSource::File(path));
        }

        match (
            non_empty(&self.google_oauth2_auth_uri),
            non_empty(&self.google_oauth2_token_uri),
            non_empty(&self.google_oauth2_client_id),
            non_empty(&self.google_oauth2_client_secret),
        ) {
            (Some(auth_uri), Some(token_uri), Some(client_id), Some(client_secret)) => {
                Some(ClientSource::Inline {
                    auth_uri,
                    token_uri,
                    client_id,
                    client_secret,
                })
            }
            _ => None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_rate)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_seconds)
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_seconds)
    }

    /// Redirect URI registered with Google for the consent callback.
    pub fn redirect_uri(&self) -> String {
        let scheme = if self.tls_enabled() { "https" } else { "http" };
        format!("{}://localhost:{}{}", scheme, self.port, OAUTH_CALLBACK_PATH)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
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

/// Prometheus exposition settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve `/metrics`.
    #[serde(default)]
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_static_root() -> String {
    ".".to_string()
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/spreadsheets".to_string()
}

fn default_sheet_range() -> String {
    "Sheet1!A:B".to_string()
}

fn default_auth_timeout() -> u64 {
    600
}

fn default_token_timeout() -> u64 {
    10
}

fn default_refresh_warn_threshold() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
