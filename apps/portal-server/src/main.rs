use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use portal_security::SystemClock;
use portal_server::Portal;
use portal_server::config::{AppConfig, LoggingConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// IT request portal backend.
#[derive(Parser, Debug)]
#[command(name = "portal-server", version, about, long_about = None)]
struct Cli {
    /// YAML configuration file; `PORTAL__SECTION__KEY` variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration (secrets redacted) and exit.
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log filter")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!(e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    if cli.print_config {
        println!("{}", config.render());
        return Ok(());
    }

    init_tracing(&config.logging)?;

    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("invalid server.bind_addr '{}'", config.server.bind_addr))?;

    let portal = Portal::init(&config, Arc::new(SystemClock)).await?;
    let cancel = CancellationToken::new();
    let sweeper = portal.ip_allowlist().spawn_log_sweeper(cancel.clone());

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            cancel.cancel();
        }
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server bound on {}", addr);

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        }
    };

    axum::serve(
        listener,
        portal
            .router()
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("HTTP server failed")?;

    cancel.cancel();
    sweeper.await.context("log sweeper task panicked")?;
    Ok(())
}
