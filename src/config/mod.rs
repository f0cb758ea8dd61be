// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{RelayError, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

impl AppConfig {
    /// Load configuration with precedence:
    /// 1. Environment variables (`CONTACT_RELAY__SERVER__PORT`, ...)
    /// 2. TOML config file (required)
    /// 3. Serde defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RelayError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix("CONTACT_RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        app.validate()?;
        Ok(app)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        app.validate()?;
        Ok(app)
    }

    /// Checks constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;

        if server.spreadsheet_id.trim().is_empty() {
            return Err(RelayError::Config(
                "server.spreadsheet_id must not be empty".to_string(),
            ));
        }

        if server.email.trim().is_empty() {
            return Err(RelayError::Config("server.email must not be empty".to_string()));
        }

        if server.port == 0 {
            return Err(RelayError::Config("server.port must not be 0".to_string()));
        }

        if server.poll_rate == 0 {
            return Err(RelayError::Config(
                "server.poll_rate must be greater than 0".to_string(),
            ));
        }

        if server.client_source().is_none() {
            return Err(RelayError::Config(
                "server.google_oauth2_client is missing (or set all of google_oauth2_auth_uri, \
                 google_oauth2_token_uri, google_oauth2_client_id, google_oauth2_client_secret)"
                    .to_string(),
            ));
        }

        let cert = server.tls_cert_path.as_deref().unwrap_or("");
        let key = server.tls_key_path.as_deref().unwrap_or("");
        if cert.is_empty() != key.is_empty() {
            return Err(RelayError::Config(
                "server.tls_cert_path and server.tls_key_path must be set together".to_string(),
            ));
        }

        if server.auth_timeout_seconds == 0 || server.token_timeout_seconds == 0 {
            return Err(RelayError::Config(
                "server timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
