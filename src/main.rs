// contact-relay - Local HTTP(S) server relaying contact submissions to Google Sheets
// Author: kelexine (https://github.com/kelexine)

use anyhow::{Context, Result};
use clap::Parser;
use contact_relay::cli::Args;
use contact_relay::config::{AppConfig, LoggingConfig};
use contact_relay::error::RelayError;
use contact_relay::oauth::descriptor::resolve_identity;
use contact_relay::oauth::{
    AuthorizationFlow, AuthorizationRequest, CaptureSlot, CredentialStore, RefreshScheduler,
    TokenEndpoint, TokenState,
};
use contact_relay::server::{create_router, tls, AppState, Dispatcher};
use contact_relay::sheets::SheetsClient;
use contact_relay::shutdown::ShutdownCoordinator;
use contact_relay::utils::logging;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init(&LoggingConfig::default());
            error!("{}", e);
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    // Phase 2: Initialize logging
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::from(e.exit_code() as u8);
    }

    if args.check_config {
        println!("{:#?}", config);
        return ExitCode::SUCCESS;
    }

    info!("Starting contact-relay v{}", env!("CARGO_PKG_VERSION"));

    match run(config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<RelayError>()
                .map(RelayError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

async fn run(config: AppConfig, args: &Args) -> Result<()> {
    let config = Arc::new(config);
    let server = &config.server;

    tls::install_crypto_provider();

    // Phase 3: Resolve the OAuth client identity
    let identity = resolve_identity(server)?;
    let store = CredentialStore::new(identity.clone());

    // Phase 4: Signals only record; the dispatcher acts on them
    let shutdown = ShutdownCoordinator::new();
    shutdown
        .spawn_listener()
        .context("Failed to install signal handlers")?;

    // Phase 5: Either start from a provisioned refresh token or run consent
    let (capture, authorization) = match server.provisioned_refresh_token() {
        Some(refresh_token) => {
            info!("Using provisioned refresh token; skipping consent flow");
            store
                .set_tokens(TokenState::from_refresh_token(refresh_token))
                .await;
            (CaptureSlot::closed(), None)
        }
        None => {
            let (capture, receiver) = CaptureSlot::channel();
            let request = AuthorizationRequest::build(&identity, server)?;
            let endpoint = TokenEndpoint::new(identity.clone(), server.token_timeout())?;
            let flow = AuthorizationFlow::new(
                request,
                receiver,
                endpoint,
                store.clone(),
                server.auth_timeout(),
            )
            .with_open_browser(args.open_browser);
            (capture, Some(flow))
        }
    };

    // Phase 6: Build the router and the refresh scheduler
    let sink = SheetsClient::new(
        store.clone(),
        server.spreadsheet_id.clone(),
        server.sheet_range.clone(),
        server.token_timeout(),
    )?;

    let state = AppState {
        config: config.clone(),
        store: store.clone(),
        capture,
        sink: Arc::new(sink),
    };
    let app = create_router(state);

    let refresh_endpoint = TokenEndpoint::new(identity, server.token_timeout())?;
    let scheduler = RefreshScheduler::new(store, refresh_endpoint, server.refresh_warn_threshold);

    // Phase 7: Serve until a signal or a fatal error
    let tls_config = tls::load_tls_config(server).await?;
    Dispatcher::new(config.clone(), app, scheduler, shutdown)
        .with_tls(tls_config)
        .with_authorization(authorization)
        .run()
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}
