//! Configuration management for module-host
//!
//! Handles configuration loading, validation, and environment overrides.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::module::registry::DEFAULT_DESCRIPTOR_NAME;
use crate::utils::env::{env_bool, env_opt};

/// Environment variable overriding [`ModuleManagerConfig::modules_dir`]
pub const ENV_MODULES_DIR: &str = "MODULE_HOST_MODULES_DIR";
/// Environment variable overriding [`ModuleManagerConfig::update_dir`]
pub const ENV_UPDATE_DIR: &str = "MODULE_HOST_UPDATE_DIR";
/// Environment variable overriding [`ShutdownConfig::listen_for_signals`]
pub const ENV_LISTEN_SIGNALS: &str = "MODULE_HOST_LISTEN_SIGNALS";

/// Module manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManagerConfig {
    /// Directory scanned for module archives
    #[serde(default = "default_modules_dir")]
    pub modules_dir: PathBuf,

    /// Archive file extension, without the dot
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,

    /// Name of the descriptor entry inside each archive
    #[serde(default = "default_descriptor_name")]
    pub descriptor_name: String,

    /// Where native module libraries are extracted before loading
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Staged updates applied before scanning (disabled if unset)
    #[serde(default)]
    pub update_dir: Option<PathBuf>,

    /// Shutdown hook behaviour
    #[serde(default)]
    pub shutdown: ShutdownConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

/// Shutdown hook configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Trigger the hook on SIGTERM / SIGINT / Ctrl+C
    ///
    /// The listener runs on the current tokio runtime, or on its own thread
    /// when there is none.
    #[serde(default = "default_true")]
    pub listen_for_signals: bool,

    /// Exit the process after a signal-triggered shutdown
    #[serde(default = "default_true")]
    pub exit_after_signal: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "module_host=debug"); `RUST_LOG` wins when set
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

fn default_true() -> bool {
    true
}

fn default_modules_dir() -> PathBuf {
    PathBuf::from("modules")
}

fn default_archive_extension() -> String {
    "zip".to_string()
}

fn default_descriptor_name() -> String {
    DEFAULT_DESCRIPTOR_NAME.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/modules/cache")
}

impl Default for ModuleManagerConfig {
    fn default() -> Self {
        Self {
            modules_dir: default_modules_dir(),
            archive_extension: default_archive_extension(),
            descriptor_name: default_descriptor_name(),
            cache_dir: default_cache_dir(),
            update_dir: None,
            shutdown: ShutdownConfig::default(),
            logging: None,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            listen_for_signals: true,
            exit_after_signal: true,
        }
    }
}

impl ModuleManagerConfig {
    /// Configuration scanning `modules_dir`, everything else default
    pub fn with_modules_dir<P: AsRef<Path>>(modules_dir: P) -> Self {
        Self {
            modules_dir: modules_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        config.validate()?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Apply `MODULE_HOST_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_opt(ENV_MODULES_DIR) {
            self.modules_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_opt(ENV_UPDATE_DIR) {
            self.update_dir = Some(PathBuf::from(dir));
        }
        if env_opt(ENV_LISTEN_SIGNALS).is_some() {
            self.shutdown.listen_for_signals = env_bool(ENV_LISTEN_SIGNALS);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let extension = self.archive_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(anyhow::anyhow!("archive_extension must not be empty"));
        }
        if self.descriptor_name.trim().is_empty() {
            return Err(anyhow::anyhow!("descriptor_name must not be empty"));
        }
        if self.update_dir.as_deref() == Some(self.modules_dir.as_path()) {
            return Err(anyhow::anyhow!(
                "update_dir must differ from modules_dir ({:?})",
                self.modules_dir
            ));
        }
        Ok(())
    }
}
