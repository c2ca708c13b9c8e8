//! Configuration management
//!
//! Everything is optional in the TOML file; each field falls back to the
//! defaults the tool has always run with.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target chat window
    #[serde(default)]
    pub window: WindowConfig,
    /// Loop timing
    #[serde(default)]
    pub engine: EngineConfig,
    /// Statistics database
    #[serde(default)]
    pub storage: StorageConfig,
    /// Log files
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Title of the chat window the commands go to
    #[serde(default = "default_window_title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wait after issuing a command before polling for the result
    #[serde(default = "default_result_delay_ms")]
    pub result_delay_ms: u64,
    /// Pause at the end of every cycle (back-pressure on the chat surface)
    #[serde(default = "default_cycle_pause_ms")]
    pub cycle_pause_ms: u64,
}

impl EngineConfig {
    pub fn result_delay(&self) -> Duration {
        Duration::from_millis(self.result_delay_ms)
    }

    pub fn cycle_pause(&self) -> Duration {
        Duration::from_millis(self.cycle_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite statistics database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rotating session logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_window_title() -> String {
    "메크로용".to_string()
}

fn default_result_delay_ms() -> u64 {
    100
}

fn default_cycle_pause_ms() -> u64 {
    500
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("forgeloop")
        .join("enhance_stats.db")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_window_title(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            result_delay_ms: default_result_delay_ms(),
            cycle_pause_ms: default_cycle_pause_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Load configuration. With an explicit path the file must exist; the
    /// default path is optional and missing means defaults throughout.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Default config location under the platform config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("forgeloop")
            .join("config.toml")
    }
}
