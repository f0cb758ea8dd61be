//! Process-wide credential store.
//!
//! Holds the resolved client identity and the current token state. Writers
//! are the consent flow (first grant) and the refresh scheduler (renewals),
//! which never run at the same time; the `RwLock` makes each update
//! whole with respect to readers such as the spreadsheet sink.

// Author: kelexine (https://github.com/kelexine)

use super::{ClientIdentity, TokenState};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct CredentialStore {
    identity: Arc<ClientIdentity>,
    tokens: Arc<RwLock<Option<TokenState>>>,
}

impl CredentialStore {
    pub fn new(identity: ClientIdentity) -> Self {
        Self {
            identity: Arc::new(identity),
            tokens: Arc::new(RwLock::new(None)),
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Snapshot of the current token state.
    pub async fn tokens(&self) -> Option<TokenState> {
        self.tokens.read().await.clone()
    }

    /// Replace the token state in one write.
    pub async fn set_tokens(&self, tokens: TokenState) {
        *self.tokens.write().await = Some(tokens);
    }

    /// The access token, only while it is still valid at `now`.
    pub async fn access_token(&self, now: i64) -> Option<String> {
        let tokens = self.tokens.read().await;
        tokens
            .as_ref()
            .filter(|t| !t.access_token.is_empty() && !t.is_expired(now))
            .map(|t| t.access_token.clone())
    }

    /// Whether a refresh token exists, i.e. the initial grant is done.
    pub async fn has_refresh_token(&self) -> bool {
        self.tokens
            .read()
            .await
            .as_ref()
            .is_some_and(|t| !t.refresh_token.is_empty())
    }

    /// (seconds until expiry, expired) for health reporting.
    pub async fn token_info(&self, now: i64) -> Option<(i64, bool)> {
        let tokens = self.tokens.read().await;
        tokens
            .as_ref()
            .map(|t| (t.expires_in_seconds(now), t.is_expired(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ClientIdentity {
        ClientIdentity {
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = CredentialStore::new(identity());
        assert!(store.tokens().await.is_none());
        assert!(store.access_token(0).await.is_none());
        assert!(!store.has_refresh_token().await);
        assert_eq!(store.identity().client_id, "client");
    }

    #[tokio::test]
    async fn test_access_token_hidden_once_expired() {
        let store = CredentialStore::new(identity());
        store
            .set_tokens(TokenState::issued("ya29.a".into(), "1//0r".into(), 60, 100))
            .await;

        assert_eq!(store.access_token(159).await.as_deref(), Some("ya29.a"));
        assert!(store.access_token(160).await.is_none());
        assert!(store.has_refresh_token().await);
        assert_eq!(store.token_info(130).await, Some((30, false)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = CredentialStore::new(identity());
        let reader = store.clone();
        store.set_tokens(TokenState::from_refresh_token("1//0r")).await;

        assert!(reader.has_refresh_token().await);
        assert!(reader.access_token(0).await.is_none());
    }
}
