//! Client for the Google OAuth2 token endpoint.
//!
//! Two grants are supported: `authorization_code` for the first exchange and
//! `refresh_token` for renewals. Both POST a form and read back a JSON body
//! carrying `access_token`, `expires_in` and, for the code grant,
//! `refresh_token`.

// Author: kelexine (https://github.com/kelexine)

use super::ClientIdentity;
use crate::error::{RelayError, Result};
use crate::utils::logging::sanitize;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Lifetime assumed when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Tokens returned by a successful grant.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Present on code grants; refresh grants only include it on rotation.
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Clone)]
pub struct TokenEndpoint {
    http_client: Client,
    identity: ClientIdentity,
}

impl TokenEndpoint {
    /// Build a client whose every call is bounded by `timeout`.
    pub fn new(identity: ClientIdentity, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            identity,
        })
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Exchange an authorization code. Failures map to `TokenExchange`.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenGrant> {
        let mut params = vec![
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        if let Some(verifier) = code_verifier {
            params.push(("code_verifier", verifier));
        }

        self.request(&params)
            .await
            .map_err(RelayError::TokenExchange)
    }

    /// Mint a new access token. Failures map to `TokenRefresh`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let params = [
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        self.request(&params).await.map_err(RelayError::TokenRefresh)
    }

    /// POST the form; on failure returns a diagnostic carrying the raw body.
    async fn request(&self, params: &[(&str, &str)]) -> std::result::Result<TokenGrant, String> {
        let response = self
            .http_client
            .post(&self.identity.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| format!("Google OAuth2 network error: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read token response: {}", e))?;

        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status.as_u16(), sanitize(&body)));
        }

        let grant = parse_grant(&body)?;
        debug!("Token endpoint granted a token valid for {} seconds", grant.expires_in);
        Ok(grant)
    }
}

/// Extract the grant from a token endpoint JSON body.
pub fn parse_grant(body: &str) -> std::result::Result<TokenGrant, String> {
    let token_data: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| format!("Malformed JSON response ({}): {}", e, sanitize(body)))?;

    let access_token = token_data
        .get("access_token")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("Missing access_token in response: {}", sanitize(body)))?
        .to_string();

    let refresh_token = token_data
        .get("refresh_token")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let expires_in = token_data
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(DEFAULT_EXPIRES_IN);

    Ok(TokenGrant {
        access_token,
        refresh_token,
        expires_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_grant() {
        let body = r#"{"access_token":"ya29.a","expires_in":3599,"refresh_token":"1//0r","scope":"s","token_type":"Bearer"}"#;
        let grant = parse_grant(body).unwrap();
        assert_eq!(grant.access_token, "ya29.a");
        assert_eq!(grant.refresh_token.as_deref(), Some("1//0r"));
        assert_eq!(grant.expires_in, 3599);
    }

    #[test]
    fn test_parse_refresh_grant_without_rotation() {
        let grant = parse_grant(r#"{"access_token":"ya29.b","token_type":"Bearer"}"#).unwrap();
        assert!(grant.refresh_token.is_none());
        assert_eq!(grant.expires_in, DEFAULT_EXPIRES_IN);
    }

    #[test]
    fn test_missing_access_token_keeps_body() {
        let err = parse_grant(r#"{"error":"invalid_grant","error_description":"Bad Request"}"#)
            .unwrap_err();
        assert!(err.contains("Missing access_token"));
        assert!(err.contains("invalid_grant"));
    }

    #[test]
    fn test_malformed_body() {
        assert!(parse_grant("<html>").is_err());
    }
}
