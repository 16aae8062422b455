//! Infrastructure adaptor binary
//!
//! Usage:
//!   infrabstract-adaptor
//!   infrabstract-adaptor --config config/adaptor.toml --log-level debug

use adaptor_config::AdaptorConfig;
use anyhow::{Context, Result};
use bay::{open_repository, WrapperBay};
use clap::Parser;
use infrabstract_adaptor::{AdaptorCore, BusBridge, Mux};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wrappers::WrapperFactory;

/// How long in-flight responses may take to leave after stop
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "infrabstract-adaptor")]
#[command(about = "Service platform infrastructure adaptor")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AdaptorConfig::load(args.config.as_deref())?;
    init_logging(&args, &config);

    info!(name = %config.adaptor.name, version = %config.adaptor.version, "Starting adaptor");
    info!(
        bus = %config.bus.address,
        repository = ?config.repository.backend,
        workers = config.adaptor.max_workers,
        "Configuration loaded"
    );

    // Without its registry the adaptor cannot answer anything
    let repository = open_repository(&config.repository)
        .await
        .context("Failed to open the VIM repository")?;
    let bay = Arc::new(WrapperBay::new(
        repository,
        WrapperFactory::new(config.backends.clone(), config.segments.clone()),
    ));

    let (mux, outbound) = Mux::channel(config.bus.queue_capacity);
    let (inbound_tx, inbound) = mpsc::channel(config.bus.queue_capacity);
    let bridge = BusBridge::connect(&config.bus, inbound_tx, outbound)
        .await
        .map_err(|e| {
            error!("Bus connection failed: {}", e);
            e
        })?;

    let mut core = AdaptorCore::new(config, bay, Arc::new(mux));
    core.start(inbound).await?;

    wait_for_shutdown().await;
    info!("Received shutdown signal");

    core.stop().await;
    drop(core);
    if tokio::time::timeout(SHUTDOWN_GRACE, bridge.shutdown()).await.is_err() {
        error!("Outbound queue not drained within {:?}", SHUTDOWN_GRACE);
    }
    Ok(())
}

fn init_logging(args: &Args, config: &AdaptorConfig) {
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    if args.json_logs || config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
