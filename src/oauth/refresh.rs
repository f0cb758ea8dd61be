//! Inline token refresh, driven by the dispatcher's poll tick.
//!
//! Each tick compares the stored token's age against its lifetime and, once
//! `now - issued_at >= ttl`, runs a `refresh_token` grant. A failure leaves
//! the old state in place so the next tick tries again; a streak of failures
//! is reported as a warning, never as a fatal error.

// Author: kelexine (https://github.com/kelexine)

use super::{CredentialStore, TokenEndpoint, TokenState};
use tracing::{debug, error, info, warn, Level};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No refresh token yet; the consent flow has not finished.
    Idle,
    /// Access token still valid.
    Fresh,
    /// A new access token was stored.
    Refreshed,
    /// The refresh failed; carries the consecutive failure count.
    Failed(u32),
}

pub struct RefreshScheduler {
    store: CredentialStore,
    endpoint: TokenEndpoint,
    consecutive_failures: u32,
    warn_threshold: u32,
}

impl RefreshScheduler {
    pub fn new(store: CredentialStore, endpoint: TokenEndpoint, warn_threshold: u32) -> Self {
        Self {
            store,
            endpoint,
            consecutive_failures: 0,
            warn_threshold: warn_threshold.max(1),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether `tokens` must be refreshed at `now`.
    pub fn is_due(tokens: &TokenState, now: i64) -> bool {
        !tokens.refresh_token.is_empty() && tokens.is_expired(now)
    }

    /// Check expiry and refresh if due.
    pub async fn tick(&mut self, now: i64) -> RefreshOutcome {
        let Some(tokens) = self.store.tokens().await else {
            return RefreshOutcome::Idle;
        };

        if tokens.refresh_token.is_empty() {
            return RefreshOutcome::Idle;
        }

        if !Self::is_due(&tokens, now) {
            return RefreshOutcome::Fresh;
        }

        debug!("OAuth access token expired; refreshing");
        match self.endpoint.refresh(&tokens.refresh_token).await {
            Ok(grant) => {
                let refresh_token = grant
                    .refresh_token
                    .clone()
                    .unwrap_or_else(|| tokens.refresh_token.clone());

                self.store
                    .set_tokens(TokenState::issued(
                        grant.access_token.clone(),
                        refresh_token,
                        grant.expires_in,
                        now,
                    ))
                    .await;

                if self.consecutive_failures > 0 {
                    info!(
                        "Token refresh recovered after {} failed attempts",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;

                info!("Refreshed access token, valid for {} seconds", grant.expires_in);
                crate::metrics::record_oauth_refresh(true);
                crate::metrics::update_oauth_expiry(grant.expires_in);
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                self.consecutive_failures += 1;
                crate::metrics::record_oauth_refresh(false);

                if failure_level(self.consecutive_failures, self.warn_threshold) == Level::ERROR {
                    error!(
                        "Token refresh has failed {} times in a row: {}",
                        self.consecutive_failures, e
                    );
                } else {
                    warn!("Token refresh failed, retrying next tick: {}", e);
                }
                RefreshOutcome::Failed(self.consecutive_failures)
            }
        }
    }
}

/// Isolated failures are warnings; a streak at the threshold is an error.
fn failure_level(consecutive_failures: u32, threshold: u32) -> Level {
    if consecutive_failures >= threshold {
        Level::ERROR
    } else {
        Level::WARN
    }
}
