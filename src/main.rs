//! DR backup sentinel
//!
//! # Architecture Overview
//!
//! ```text
//!   scheduler / operator
//!          │
//!          ▼
//!   ┌──────────────┐   check      ┌───────────────┐    ┌───────────┐
//!   │     CLI      │─────────────▶│ BackupMonitor │───▶│  Probe    │
//!   │  (this file) │              └──────┬────────┘    └───────────┘
//!   │              │                     ▼
//!   │              │              evaluate → aggregate → Notifier / Metrics
//!   │              │
//!   │              │ provision     ┌──────────────────┐  ┌─────────────┐
//!   │              │ sweep         │ LifecycleManager │─▶│ Provisioner │
//!   │              │ reconcile  ──▶│                  │─▶│ Registry    │
//!   │              │ copy-snapshot │                  │  │             │
//!   └──────────────┘               └──────────────────┘  └─────────────┘
//! ```
//!
//! Each subcommand is one invocation; scheduling is left to the caller.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use dr_sentinel::collaborators::{MetricsEmitter, Notifier, Registry};
use dr_sentinel::config::load_config;
use dr_sentinel::inventory::InventoryFile;
use dr_sentinel::observability::{logging, metrics};
use dr_sentinel::registry::FileRegistry;
use dr_sentinel::restore::ResourceKind;
use dr_sentinel::{notify, BackupMonitor, InvocationStatus, LifecycleManager, SentinelConfig};

#[derive(Parser)]
#[command(name = "dr-sentinel")]
#[command(about = "Backup health checks and restore-test lifecycle", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "dr-sentinel.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate backup health across all configured subsystems
    Check {
        /// Send the full report even when healthy
        #[arg(long)]
        summary: bool,
    },
    /// Launch one restore-test resource
    Provision {
        #[arg(value_enum)]
        kind: KindArg,
    },
    /// Reclaim expired and previously failed test resources
    Sweep,
    /// Register tagged test resources missing from the registry
    Reconcile,
    /// Copy the latest primary database snapshot into the restore region
    CopySnapshot {
        /// Database to copy; defaults to targets.database
        #[arg(long)]
        db_instance_id: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Database,
    Compute,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Database => ResourceKind::DatabaseInstance,
            KindArg::Compute => ResourceKind::ComputeInstance,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(config = %cli.config.display(), "dr-sentinel v0.1.0 starting");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let inventory = Arc::new(open_inventory(&config)?);
    let notifier = notify::from_destination(
        &config.notifications.destination,
        Duration::from_secs(config.timeouts.notify_secs),
    )?;
    let emitter: Arc<dyn MetricsEmitter> = Arc::new(metrics::PrometheusEmitter);

    match cli.command {
        Commands::Check { summary } => {
            let send_summary = summary || config.notifications.send_summary;
            let monitor = BackupMonitor::new(inventory, notifier, emitter, config);
            let outcome = monitor.run(send_summary).await;
            print_json(&outcome)?;
            if outcome.status == InvocationStatus::InternalFailure {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Provision { kind } => {
            let manager = lifecycle_manager(&config, inventory, notifier, emitter)?;
            print_json(&manager.provision(kind.into(), Utc::now()).await?)?;
        }
        Commands::Sweep => {
            let manager = lifecycle_manager(&config, inventory, notifier, emitter)?;
            print_json(&manager.sweep(Utc::now()).await?)?;
        }
        Commands::Reconcile => {
            let manager = lifecycle_manager(&config, inventory, notifier, emitter)?;
            print_json(&manager.reconcile().await?)?;
        }
        Commands::CopySnapshot { db_instance_id } => {
            let db_instance_id = db_instance_id
                .or_else(|| config.targets.database.as_ref().map(|t| t.db_instance_id.clone()))
                .ok_or("no database given and targets.database is not set")?;
            let manager = lifecycle_manager(&config, inventory, notifier, emitter)?;
            print_json(&manager.copy_latest_snapshot(&db_instance_id, Utc::now()).await?)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open_inventory(config: &SentinelConfig) -> Result<InventoryFile, Box<dyn std::error::Error>> {
    match &config.inventory.path {
        Some(path) => Ok(InventoryFile::load(path)?),
        None => Err("inventory.path is not set; no other provider is built in".into()),
    }
}

fn lifecycle_manager(
    config: &SentinelConfig,
    inventory: Arc<InventoryFile>,
    notifier: Arc<dyn Notifier>,
    emitter: Arc<dyn MetricsEmitter>,
) -> Result<LifecycleManager, Box<dyn std::error::Error>> {
    Ok(LifecycleManager::new(
        inventory,
        open_registry(config)?,
        notifier,
        emitter,
        config.restore.clone(),
        config.timeouts.clone(),
    ))
}

fn open_registry(config: &SentinelConfig) -> Result<Arc<dyn Registry>, Box<dyn std::error::Error>> {
    match &config.registry.path {
        Some(path) => Ok(Arc::new(FileRegistry::load_from_file(path)?)),
        None => {
            tracing::warn!("registry.path is not set; records will not outlive this run");
            Ok(Arc::new(FileRegistry::in_memory()))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
