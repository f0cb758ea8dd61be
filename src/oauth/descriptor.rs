//! Google OAuth2 client descriptor resolution.
//!
//! Google hands out client descriptors as JSON documents whose interesting
//! part is nested under `installed` (desktop clients) or `web` (web clients):
//!
//! ```json
//! { "installed": { "client_id": "...", "client_secret": "...",
//!                  "auth_uri": "...", "token_uri": "..." } }
//! ```
//!
//! The identity can also be given inline in `[server]`.

// Author: kelexine (https://github.com/kelexine)

use super::ClientIdentity;
use crate::config::{ClientSource, ServerConfig};
use crate::error::{RelayError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize)]
struct DescriptorDocument {
    installed: Option<DescriptorFields>,
    web: Option<DescriptorFields>,
}

#[derive(Deserialize)]
struct DescriptorFields {
    auth_uri: Option<String>,
    token_uri: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

/// Resolve the client identity from whichever source the config names.
pub fn resolve_identity(config: &ServerConfig) -> Result<ClientIdentity> {
    match config.client_source() {
        Some(ClientSource::File(path)) => load_descriptor(path),
        Some(ClientSource::Inline {
            auth_uri,
            token_uri,
            client_id,
            client_secret,
        }) => Ok(ClientIdentity {
            auth_uri: auth_uri.to_string(),
            token_uri: token_uri.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }),
        None => Err(RelayError::Config(
            "No OAuth2 client descriptor configured".to_string(),
        )),
    }
}

/// Read and parse a descriptor document from disk.
pub fn load_descriptor(path: impl AsRef<Path>) -> Result<ClientIdentity> {
    let path = path.as_ref();
    debug!("Parsing OAuth2 client data in {}", path.display());

    let contents = fs::read_to_string(path).map_err(|e| {
        RelayError::ClientDescriptor(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_descriptor(&contents)
}

/// Parse a descriptor document. Every field must be present and non-empty.
pub fn parse_descriptor(contents: &str) -> Result<ClientIdentity> {
    let document: DescriptorDocument = serde_json::from_str(contents)
        .map_err(|e| RelayError::ClientDescriptor(format!("Invalid client JSON: {}", e)))?;

    let fields = document.installed.or(document.web).ok_or_else(|| {
        RelayError::ClientDescriptor(
            "Client JSON has neither an `installed` nor a `web` section".to_string(),
        )
    })?;

    Ok(ClientIdentity {
        auth_uri: required(fields.auth_uri, "auth_uri")?,
        token_uri: required(fields.token_uri, "token_uri")?,
        client_id: required(fields.client_id, "client_id")?,
        client_secret: required(fields.client_secret, "client_secret")?,
    })
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RelayError::ClientDescriptor(format!(
            "Client JSON is missing `{}`",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn installed_json() -> String {
        serde_json::json!({
            "installed": {
                "client_id": "123.apps.googleusercontent.com",
                "project_id": "contacts",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "client_secret": "GOCSPX-test",
                "redirect_uris": ["http://localhost"]
            }
        })
        .to_string()
    }

    #[test]
    fn test_load_installed_descriptor() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{}", installed_json()).unwrap();

        let identity = load_descriptor(temp.path()).unwrap();
        assert_eq!(identity.client_id, "123.apps.googleusercontent.com");
        assert_eq!(identity.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(identity.client_secret, "GOCSPX-test");
    }

    #[test]
    fn test_web_descriptor_accepted() {
        let json = installed_json().replace("installed", "web");
        let identity = parse_descriptor(&json).unwrap();
        assert_eq!(identity.auth_uri, "https://accounts.google.com/o/oauth2/auth");
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = serde_json::json!({
            "installed": {
                "client_id": "123",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        })
        .to_string();

        let err = parse_descriptor(&json).unwrap_err();
        assert!(matches!(err, RelayError::ClientDescriptor(ref m) if m.contains("client_secret")));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = parse_descriptor("{ not json").unwrap_err();
        assert!(matches!(err, RelayError::ClientDescriptor(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_missing_file() {
        let result = load_descriptor("/nonexistent/client.json");
        assert!(matches!(result, Err(RelayError::ClientDescriptor(_))));
    }
}
