//! Configuration management for memco.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (MEMCO_DATABASE_PATH)
//! 2. Config file (MEMCO_CONFIG or ~/.memco/config.toml)
//! 3. Default values

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memco_sdk::CoordinatorConfig;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordinator settings (database, review, storage, retrieval, hooks, maintenance)
    #[serde(flatten)]
    pub coordinator: CoordinatorConfig,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memco")
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(std::env::var("MEMCO_DATABASE_PATH").ok());
        config.apply_defaults(&default_data_dir());
        config
            .coordinator
            .validate()
            .context("Invalid memco configuration")?;
        Ok(config)
    }

    /// Read a TOML file, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        match std::env::var("MEMCO_CONFIG") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_data_dir().join("config.toml"),
        }
    }

    /// Apply the database path override.
    fn apply_env(&mut self, database_path: Option<String>) {
        if let Some(path) = database_path.filter(|p| !p.trim().is_empty()) {
            self.coordinator.database_path = Some(PathBuf::from(path));
        }
    }

    /// Fill paths left unset relative to the data directory.
    fn apply_defaults(&mut self, data_dir: &Path) {
        if self.coordinator.database_path.is_none() {
            self.coordinator.database_path = Some(data_dir.join("memco.db"));
        }
        if self.coordinator.hooks.transcripts_dir.is_none() {
            self.coordinator.hooks.transcripts_dir = Some(data_dir.join("transcripts"));
        }
    }
}
