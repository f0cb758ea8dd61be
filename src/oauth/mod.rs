// OAuth2 credential handling: identity, token state and the consent/refresh flows
// Author: kelexine (https://github.com/kelexine)

pub mod capture;
pub mod descriptor;
pub mod endpoint;
pub mod flow;
pub mod refresh;
mod store;

pub use capture::{AuthorizationCapture, CaptureReceiver, CaptureSlot, Delivery};
pub use endpoint::{TokenEndpoint, TokenGrant};
pub use flow::{AuthorizationFlow, AuthorizationRequest};
pub use refresh::{RefreshOutcome, RefreshScheduler};
pub use store::CredentialStore;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Google OAuth2 client identity, resolved once at startup.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ClientIdentity {
    pub auth_uri: String,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Access/refresh token pair with its issue time and lifetime (seconds).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TokenState {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp the access token was issued at.
    pub issued_at: i64,
    /// Lifetime of the access token.
    pub ttl_seconds: i64,
}

// Custom Debug impl that never logs tokens
impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenState {
    /// Build state from a freshly granted token.
    pub fn issued(access_token: String, refresh_token: String, ttl_seconds: i64, now: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            issued_at: now,
            ttl_seconds,
        }
    }

    /// State for a provisioned refresh token; expired from the start so the
    /// first scheduler tick mints an access token.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: refresh_token.into(),
            issued_at: 0,
            ttl_seconds: 0,
        }
    }

    /// The access token is valid iff `now - issued_at < ttl`.
    pub fn is_expired(&self, now: i64) -> bool {
        now.saturating_sub(self.issued_at) >= self.ttl_seconds
    }

    /// Seconds until expiry, negative once expired.
    pub fn expires_in_seconds(&self, now: i64) -> i64 {
        self.issued_at.saturating_add(self.ttl_seconds) - now
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_impl_masks_tokens() {
        let tokens = TokenState::issued(
            "ya29.secret".to_string(),
            "1//01refresh".to_string(),
            3599,
            1_700_000_000,
        );

        let debug_str = format!("{:?}", tokens);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("ya29"));
        assert!(!debug_str.contains("1//01"));

        let identity = ClientIdentity {
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "client".to_string(),
            client_secret: "GOCSPX-secret".to_string(),
        };
        assert!(!format!("{:?}", identity).contains("GOCSPX"));
    }

    #[test]
    fn test_expiry_boundary() {
        let tokens = TokenState::issued("a".into(), "r".into(), 3600, 1_000);

        assert!(!tokens.is_expired(1_000));
        assert!(!tokens.is_expired(4_599));
        assert!(tokens.is_expired(4_600));
        assert_eq!(tokens.expires_in_seconds(4_000), 600);
    }

    #[test]
    fn test_provisioned_token_is_expired() {
        let tokens = TokenState::from_refresh_token("1//0abc");
        assert!(tokens.is_expired(0));
        assert!(tokens.is_expired(unix_now()));
        assert!(tokens.access_token.is_empty());
    }
}
