//! whyis API server

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use whyis_market::{MarketConfig, StockService};
use whyis_server::{AppState, router};
use whyis_utils::{Config, LogFormat, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "whyis-server")]
#[command(about = "Explain why a stock is moving today", long_about = None)]
struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "WHYIS_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Log output format (pretty or json)
    #[arg(long, env = "WHYIS_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.log_format);

    let app_config = Config::from_env();
    let market_config = MarketConfig::from_env().context("invalid market configuration")?;
    let service = StockService::from_config(&market_config).context("failed to build market service")?;

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    info!(
        app = %app_config.app_name,
        environment = %app_config.environment,
        "Listening on {}",
        args.bind
    );

    axum::serve(listener, router(AppState::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
    }
}
