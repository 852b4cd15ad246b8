//! Module host binary
//!
//! Loads every module archive in the modules directory, then waits for a
//! shutdown signal and disables the modules.
//!
//! Usage:
//!   module-host [--config <file>] [--modules-dir <dir>] [--log-filter <filter>]

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use module_host::utils::{init_logging_from_config, wait_for_shutdown_signal};
use module_host::{LoggingConfig, ModuleManager, ModuleManagerConfig};

#[derive(Parser, Debug)]
#[command(name = "module-host", version, about = "Load and run module archives")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory scanned for module archives (overrides config and env)
    #[arg(long)]
    modules_dir: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "module_host=trace" (RUST_LOG wins)
    #[arg(long)]
    log_filter: Option<String>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<ModuleManagerConfig> {
        let mut config = match &self.config {
            Some(path) => ModuleManagerConfig::from_file(path)?,
            None => ModuleManagerConfig::default(),
        };
        config.apply_env_overrides();

        if let Some(dir) = &self.modules_dir {
            config.modules_dir = dir.clone();
        }
        if let Some(filter) = &self.log_filter {
            config
                .logging
                .get_or_insert_with(LoggingConfig::default)
                .filter = Some(filter.clone());
        }
        // the signal is awaited below; the hook's own listener is not needed
        config.shutdown.listen_for_signals = false;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;
    init_logging_from_config(config.logging.as_ref());

    info!("Module host {} starting", env!("CARGO_PKG_VERSION"));

    let mut manager = ModuleManager::new(config);
    manager
        .init()
        .with_context(|| format!("Failed to load modules from {:?}", manager.modules_dir()))?;

    for descriptor in manager.descriptors() {
        info!(
            "  {} v{} by {} - {}",
            descriptor.name(),
            descriptor.version(),
            descriptor.author(),
            descriptor.description()
        );
    }

    match wait_for_shutdown_signal().await {
        Some(signal) => info!("Received {}, shutting down", signal),
        None => warn!("No shutdown signal handler, stopping now"),
    }

    if let Some(report) = manager.shutdown() {
        info!(
            "Module host stopped ({} disabled, {} failed)",
            report.disabled.len(),
            report.failed.len()
        );
    }
    Ok(())
}
