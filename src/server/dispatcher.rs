//! The main loop: serves HTTP, runs inline token refresh on each poll tick,
//! watches the authorization worker and stops on a termination signal.
//!
//! Connection handling runs on the axum-server task; everything that touches
//! token lifetime runs here, so a refresh never races another refresh.

// Author: kelexine (https://github.com/kelexine)

use crate::config::{AppConfig, ServerConfig};
use crate::error::{RelayError, Result};
use crate::oauth::{unix_now, AuthorizationFlow, RefreshScheduler};
use crate::shutdown::{signal_name, ShutdownCoordinator};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How long in-flight requests get to finish once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct Dispatcher {
    config: Arc<AppConfig>,
    router: Router,
    scheduler: RefreshScheduler,
    shutdown: ShutdownCoordinator,
    tls: Option<RustlsConfig>,
    authorization: Option<AuthorizationFlow>,
    handle: Handle,
}

impl Dispatcher {
    pub fn new(
        config: Arc<AppConfig>,
        router: Router,
        scheduler: RefreshScheduler,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            config,
            router,
            scheduler,
            shutdown,
            tls: None,
            authorization: None,
            handle: Handle::new(),
        }
    }

    /// Serve HTTPS with the given certificate.
    pub fn with_tls(mut self, tls: Option<RustlsConfig>) -> Self {
        self.tls = tls;
        self
    }

    /// Run the consent flow on a worker task alongside the server.
    pub fn with_authorization(mut self, flow: Option<AuthorizationFlow>) -> Self {
        self.authorization = flow;
        self
    }

    /// Server handle; `listening()` yields the bound address once serving.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    pub async fn run(self) -> Result<()> {
        let Dispatcher {
            config,
            router,
            mut scheduler,
            shutdown,
            tls,
            authorization,
            handle,
        } = self;

        let addr = bind_address(&config.server)?;
        let scheme = if tls.is_some() { "https" } else { "http" };
        let service = router.into_make_service();

        let mut server: Option<JoinHandle<std::io::Result<()>>> = Some(match tls {
            Some(tls) => tokio::spawn(
                axum_server::bind_rustls(addr, tls)
                    .handle(handle.clone())
                    .serve(service),
            ),
            None => tokio::spawn(axum_server::bind(addr).handle(handle.clone()).serve(service)),
        });

        match handle.listening().await {
            Some(bound) => info!("Listening on {}://{}", scheme, bound),
            None => {
                // The server task ended before binding; surface its error
                let result = join_task(&mut server).await;
                return Err(match result {
                    Ok(Err(e)) => RelayError::Internal(format!("Failed to bind {}: {}", addr, e)),
                    Ok(Ok(())) => RelayError::Internal(format!("Server on {} exited before listening", addr)),
                    Err(e) => RelayError::Internal(format!("Server task failed: {}", e)),
                });
            }
        }

        let mut worker = authorization.map(|flow| {
            info!("No refresh token configured; starting OAuth consent flow");
            tokio::spawn(flow.run())
        });

        let mut ticker = tokio::time::interval(config.server.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome: Result<()> = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if shutdown.is_shutdown() {
                        info!("Received {}, shutting down", signal_name(shutdown.last_signal()));
                        break Ok(());
                    }
                    let result = scheduler.tick(unix_now()).await;
                    debug!(?result, "Poll tick");
                }
                _ = shutdown.notified() => {
                    info!("Received {}, shutting down", signal_name(shutdown.last_signal()));
                    break Ok(());
                }
                result = join_task(&mut worker) => {
                    worker = None;
                    match result {
                        Ok(Ok(())) => info!("OAuth consent flow complete"),
                        Ok(Err(e)) => {
                            error!("OAuth consent flow failed: {}", e);
                            break Err(e);
                        }
                        Err(e) => break Err(RelayError::Internal(format!("Authorization worker panicked: {}", e))),
                    }
                }
                result = join_task(&mut server) => {
                    server = None;
                    break Err(match result {
                        Ok(Ok(())) => RelayError::Internal("HTTP server stopped unexpectedly".to_string()),
                        Ok(Err(e)) => RelayError::Io(e),
                        Err(e) => RelayError::Internal(format!("Server task failed: {}", e)),
                    });
                }
            }
        };

        if let Some(worker) = worker.take() {
            worker.abort();
        }

        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        if let Some(server) = server.take() {
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Server error during shutdown: {}", e),
                Err(e) => warn!("Server task failed during shutdown: {}", e),
            }
        }

        info!("Server shut down");
        outcome
    }
}

/// `host:port` from config. Host must be an IP literal.
pub fn bind_address(config: &ServerConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            RelayError::Config(format!(
                "Invalid listen address {}:{}: {}",
                config.host, config.port, e
            ))
        })
}

/// Await a task if there is one; pend forever otherwise.
async fn join_task<T>(task: &mut Option<JoinHandle<T>>) -> std::result::Result<T, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
