//! # Wallet Server
//!
//! Entry point for the `walletd` binary. Parses CLI arguments, initializes
//! logging, assembles the wallet context, and serves the HTTP API until a
//! shutdown signal arrives.

mod api;
mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use wallet_core::config::Config;
use wallet_core::WalletContext;

use cli::{Commands, WalletCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = WalletCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Version => {
            println!("walletd {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Starts the HTTP server over the configured wallet directory.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "walletd=info,wallet_core=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    std::fs::create_dir_all(&args.wallet_dir).with_context(|| {
        format!(
            "failed to create wallet directory: {}",
            args.wallet_dir.display()
        )
    })?;

    let mut config = Config::load(&args.wallet_dir)
        .with_context(|| format!("failed to load config from {}", args.wallet_dir.display()))?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    tracing::info!(
        db = %config.database_path.display(),
        rates_url = %config.rates_url,
        bind = %config.bind,
        "starting walletd"
    );

    let ctx = WalletContext::with_config(&config)
        .await
        .context("failed to initialize wallet context")?;

    let router = api::create_router(api::AppState { ctx: Arc::new(ctx) });

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.bind))?;
    tracing::info!("API server listening on {}", config.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("walletd stopped");
    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining connections");
}
