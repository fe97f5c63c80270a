//! # surveyor
//!
//! Exploration-journal monitor binary: loads configuration and the value
//! models, opens the store, and wires the tracker, checkpoint scheduler,
//! and journal readers together.

#![deny(unsafe_code)]

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use surveyor_core::{SystemAddress, WeightModel};
use surveyor_monitor::{follow, prime, SystemTracker};
use surveyor_store::{open_store, CheckpointScheduler, StoreBackend};

use crate::config::{default_config_path, AppConfig};

/// Exploration journal monitor.
#[derive(Parser, Debug)]
#[command(name = "surveyor", about = "Elite Dangerous exploration journal monitor")]
struct Cli {
    /// Config file (default: ~/.config/surveyor/config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Journal directory to watch.
    #[arg(long)]
    journal_dir: Option<PathBuf>,

    /// Directory holding the store's on-disk artifacts.
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Store backend (kv or sqlite).
    #[arg(long)]
    backend: Option<StoreBackend>,

    /// Delete store artifacts before opening.
    #[arg(long)]
    reset: bool,

    /// Skip the backlog replay.
    #[arg(long)]
    no_prime: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay the journal backlog, then follow the live journal (default).
    Run,
    /// Print a stored system as pretty JSON.
    Show { address: SystemAddress },
    /// Remove a body from a stored system.
    RemoveBody { address: SystemAddress, body: String },
}

impl Cli {
    /// Fold command-line flags over the loaded config. Flags win.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.journal_dir {
            config.journal_dir = Some(dir.clone());
        }
        if let Some(path) = &self.store_path {
            config.store.path = path.clone();
        }
        if let Some(backend) = self.backend {
            config.store.backend = backend;
        }
        if self.reset {
            config.store.reset_on_start = true;
        }
        if self.no_prime {
            config.prime.enabled = false;
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SURVEYOR_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    if cli.config.is_some() && !config_path.exists() {
        bail!("config file {} does not exist", config_path.display());
    }
    let mut config = AppConfig::load(&config_path)?;
    cli.apply(&mut config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Show { address } => show(config, address).await,
        Command::RemoveBody { address, body } => remove_body(config, address, &body).await,
    }
}

async fn run(config: AppConfig) -> Result<()> {
    let journal_dir = config
        .journal_dir
        .clone()
        .context("no journal directory configured; set journalDir or pass --journal-dir")?;

    let base =
        WeightModel::from_path(&config.models.base).context("failed to load base value model")?;
    let refined = WeightModel::from_path(&config.models.refined)
        .context("failed to load refined value model")?;

    let store = open_store(&config.store).await?;
    info!(
        backend = %config.store.backend,
        path = %config.store.path.display(),
        "store ready"
    );

    let tracker = SystemTracker::new(store.clone(), Box::new(base), Box::new(refined));

    let shutdown = CancellationToken::new();
    let scheduler = CheckpointScheduler::new(store.clone(), &config.store);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; shutting down");
                shutdown.cancel();
            }
        });
    }

    if config.prime.enabled {
        prime(
            &tracker,
            &journal_dir,
            config.prime.epoch_instant(),
            &shutdown,
        )
        .await?;
    } else {
        info!("backlog replay disabled");
    }

    follow(&tracker, &journal_dir, &shutdown).await?;

    shutdown.cancel();
    if let Err(e) = scheduler_handle.await {
        warn!(error = %e, "checkpoint loop did not join cleanly");
    }
    tracker.flush().await?;
    store.shutdown().await?;
    info!("shutdown complete");
    Ok(())
}

async fn show(config: AppConfig, address: SystemAddress) -> Result<()> {
    let store = open_store(&config.store).await?;
    let system = store.get(address, None).await?;
    println!("{}", serde_json::to_string_pretty(&system)?);
    store.shutdown().await?;
    Ok(())
}

async fn remove_body(config: AppConfig, address: SystemAddress, body: &str) -> Result<()> {
    let store = open_store(&config.store).await?;
    let mut system = store.get(address, None).await?;
    if system.remove_body(body) {
        let system = store.put(system).await?;
        println!("removed {body} from {system}");
    } else {
        println!("no body named {body} in {system}");
    }
    store.shutdown().await?;
    Ok(())
}
