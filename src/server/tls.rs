// TLS setup for the listener
// Author: kelexine (https://github.com/kelexine)

use crate::config::ServerConfig;
use crate::error::{RelayError, Result};
use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

/// Install the ring crypto provider for rustls. Safe to call more than once.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Load the configured certificate chain and key, or `None` for plain HTTP.
pub async fn load_tls_config(config: &ServerConfig) -> Result<Option<RustlsConfig>> {
    let Some((cert_path, key_path)) = config.tls_paths() else {
        return Ok(None);
    };

    info!("Loading TLS certificate from {}", cert_path);
    let tls = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| {
            RelayError::Config(format!(
                "Failed to load TLS certificate/key ({}, {}): {}",
                cert_path, key_path, e
            ))
        })?;

    Ok(Some(tls))
}
