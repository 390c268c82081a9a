use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scand::config::{AppConfig, ServeOverrides};
use scand::core::{AdmissionGate, ScanEngine};
use scand::web::WebServer;
use scand::{context, db, logging, stores};

#[derive(Parser)]
#[command(name = "scand")]
#[command(about = "Security scan job service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scan API server.
    Serve(ServeOverrides),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve(args) => {
            let config = AppConfig::new(Some(args))?;
            serve(config).await.context("failed to start scan service")
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    logging::init(&config.logging);
    let config = Arc::new(config);

    let conn = db::init(&config.database.path)
        .await
        .context("failed to open scan database")?;
    let store = stores::from_config(&config.rate_limit).await?;

    let gate = AdmissionGate::new(store, config.rate_limit.key_prefix.clone());
    let engine = ScanEngine::new(conn, &config.scanning, &config.tools);
    let ctx = context::AppContext::new(Arc::clone(&config), engine, gate);

    let bind_addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;

    let server = Arc::new(WebServer::new(ctx.clone(), bind_addr));
    let signal_target = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_target.shutdown();
        }
    });

    server.start().await?;

    // In-flight scans finish before the process exits; anything still
    // running at a hard kill stays `running` and is abandoned.
    tracing::info!("draining in-flight scans");
    ctx.engine.drain().await;

    Ok(())
}
