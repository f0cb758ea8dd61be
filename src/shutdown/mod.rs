//! Termination signal handling.
//!
//! The listener task only records the signal number and wakes the
//! dispatcher; the dispatcher loop observes `last_signal() != 0`, logs and
//! shuts the server down.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub const SIGINT: i32 = 2;
pub const SIGTERM: i32 = 15;

#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    last_signal: Arc<AtomicI32>,
    notify: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the signal and wake the loop. Nothing else happens here.
    pub fn record(&self, signal: i32) {
        self.last_signal.store(signal, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Most recent termination signal, 0 if none.
    pub fn last_signal(&self) -> i32 {
        self.last_signal.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.last_signal() != 0
    }

    /// Completes after the next `record`, or immediately if one happened
    /// while nobody was waiting.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Install SIGINT/SIGTERM handlers feeding this coordinator.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let coordinator = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(()) = sigint.recv() => coordinator.record(SIGINT),
                    Some(()) = sigterm.recv() => coordinator.record(SIGTERM),
                    else => break,
                }
            }
        });

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> std::io::Result<()> {
        let coordinator = self.clone();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                coordinator.record(SIGINT);
            }
        });

        Ok(())
    }
}

/// Human-readable name for logging.
pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        _ => "signal",
    }
}
