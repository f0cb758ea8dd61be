//! One-shot handoff of the consent redirect from the HTTP handler to the
//! authorization worker.
//!
//! The slot starts `Waiting` with the sending half of a `oneshot` channel.
//! The first delivery moves it to `Delivered` for the rest of the process,
//! so a replayed or second redirect can never overwrite the first code.

// Author: kelexine (https://github.com/kelexine)

use crate::error::{RelayError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Query parameters Google appends to the redirect URI.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthorizationCapture {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the operator denied consent.
    pub error: Option<String>,
}

impl std::fmt::Debug for AuthorizationCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationCapture")
            .field("code", &self.code.as_ref().map(|_| "[REDACTED]"))
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}

/// Result of handing a capture to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// First delivery, passed to the worker.
    Accepted,
    /// A capture was already delivered; this one was dropped.
    AlreadyDelivered,
    /// No consent flow is running in this process.
    NotExpected,
}

enum SlotState {
    Waiting(oneshot::Sender<AuthorizationCapture>),
    Delivered,
    Closed,
}

/// Producer side, held by the HTTP handlers.
#[derive(Clone)]
pub struct CaptureSlot {
    state: Arc<Mutex<SlotState>>,
}

/// Consumer side, held by the authorization worker.
pub struct CaptureReceiver {
    rx: oneshot::Receiver<AuthorizationCapture>,
}

impl CaptureSlot {
    /// A slot waiting for exactly one capture.
    pub fn channel() -> (Self, CaptureReceiver) {
        let (tx, rx) = oneshot::channel();
        let slot = Self {
            state: Arc::new(Mutex::new(SlotState::Waiting(tx))),
        };
        (slot, CaptureReceiver { rx })
    }

    /// A slot that accepts nothing, used when a refresh token was provisioned.
    pub fn closed() -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState::Closed)),
        }
    }

    /// Hand over a capture. Only the first call while waiting is accepted.
    pub fn deliver(&self, capture: AuthorizationCapture) -> Delivery {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SlotState::Delivered) {
            SlotState::Waiting(tx) => {
                // A dropped receiver means the worker already gave up; the
                // slot still counts as used.
                if tx.send(capture).is_err() {
                    debug!("Authorization worker is gone, capture discarded");
                }
                Delivery::Accepted
            }
            SlotState::Delivered => Delivery::AlreadyDelivered,
            SlotState::Closed => {
                *state = SlotState::Closed;
                Delivery::NotExpected
            }
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Delivered)
    }
}

impl CaptureReceiver {
    /// Wait for the redirect, giving up after `timeout`.
    pub async fn wait(self, timeout: Duration) -> Result<AuthorizationCapture> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(capture)) => Ok(capture),
            Ok(Err(_)) => Err(RelayError::Internal(
                "Capture slot dropped before a redirect arrived".to_string(),
            )),
            Err(_) => Err(RelayError::AuthorizationTimeout(timeout.as_secs())),
        }
    }
}
