//! Prediction Arena Server
//!
//! Serves the submission API and drains the evaluation queue.

use anyhow::Result;
use clap::Parser;
use predict_arena::config::{ArenaConfig, DispatchMode, StorageBackend, TriggerMode};
use predict_arena::{run_server, Arena};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "arena-server")]
#[command(about = "Prediction Arena evaluation server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "ARENA_CONFIG")]
    config: Option<PathBuf>,

    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// serial | parallel
    #[arg(long)]
    dispatch: Option<DispatchMode>,

    /// background | manual
    #[arg(long)]
    trigger: Option<TriggerMode>,

    /// memory | sqlite
    #[arg(long)]
    storage: Option<StorageBackend>,

    /// SQLite database file
    #[arg(long)]
    db_path: Option<PathBuf>,
}

impl Args {
    /// Defaults, then the TOML file, then environment, then flags.
    fn load_config(&self) -> Result<ArenaConfig> {
        let mut config = match &self.config {
            Some(path) => ArenaConfig::from_file(path)?,
            None => ArenaConfig::default(),
        };
        config.apply_env()?;

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(mode) = self.dispatch {
            config.scheduler.dispatch_mode = mode;
        }
        if let Some(mode) = self.trigger {
            config.scheduler.trigger_mode = mode;
        }
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        if let Some(path) = &self.db_path {
            config.storage.path = path.clone();
        }
        Ok(config)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("predict_arena=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = args.load_config()?;

    info!("Starting Prediction Arena Server");
    info!("  Storage: {:?} ({:?})", config.storage.backend, config.storage.path);
    info!(
        "  Evaluation: timeout {}s, {} retr{}",
        config.evaluation.timeout_secs,
        config.evaluation.max_retries,
        if config.evaluation.max_retries == 1 { "y" } else { "ies" }
    );

    let arena = Arena::build(config)?;
    run_server(arena, shutdown_signal()).await
}
