//! ---
//! poolio_section: "01-core-functionality"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Shared primitives and utilities for Poolio nodes."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_max_message_bytes() -> usize {
    4096
}

fn default_command_max_age() -> Duration {
    Duration::from_secs(300)
}

fn default_status_max_age() -> Duration {
    Duration::from_secs(900)
}

fn default_max_future_skew() -> Duration {
    Duration::from_secs(60)
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for Poolio message tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "POOLIO_CONFIG";

    /// Load configuration from disk, respecting the `POOLIO_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.validation.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Identity of the node running the tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Default device identifier stamped on outbound envelopes.
    #[serde(default)]
    pub id: Option<String>,
}

/// Screening thresholds applied to inbound messages.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationConfig {
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Maximum age for commands, command responses and config updates.
    #[serde(default = "default_command_max_age")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub command_max_age: Duration,
    /// Maximum age for status reports and events.
    #[serde(default = "default_status_max_age")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub status_max_age: Duration,
    /// Tolerated clock skew for timestamps ahead of the receiver.
    #[serde(default = "default_max_future_skew")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub max_future_skew: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message_bytes(),
            command_max_age: default_command_max_age(),
            status_max_age: default_status_max_age(),
            max_future_skew: default_max_future_skew(),
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_message_bytes == 0 {
            return Err(anyhow!("validation.max_message_bytes must be positive"));
        }
        if self.command_max_age.is_zero() || self.status_max_age.is_zero() {
            return Err(anyhow!("validation max ages must be positive"));
        }
        if self.command_max_age > self.status_max_age {
            return Err(anyhow!(
                "validation.command_max_age ({}s) must not exceed validation.status_max_age ({}s)",
                self.command_max_age.as_secs(),
                self.status_max_age.as_secs()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Directory for the rolling log file. Logs go to stderr only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
