//! Configuration Module
//!
//! Handles application configuration loading, validation, and management.

pub mod secrets;

pub use secrets::SecretString;

use crate::migration::form::{DEFAULT_LOCATION, LOCATIONS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote migration service
    #[serde(default)]
    pub service: ServiceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Initial values for the wizard form
    #[serde(default)]
    pub defaults: FormDefaults,
}

/// Migration service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the migration service (default: "http://127.0.0.1:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the launch endpoint (default: "/migrate")
    #[serde(default = "default_migrate_path")]
    pub migrate_path: String,

    /// Connection establishment timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_migrate_path() -> String {
    "/migrate".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            migrate_path: default_migrate_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Full URL of the launch endpoint
    pub fn launch_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.migrate_path
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory override
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Non-secret form defaults, applied at start-up and on every reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefaults {
    /// Region code preselected in the destination step
    #[serde(default = "default_rocket_location")]
    pub rocket_location: u32,

    /// Run the remote browser in visual mode
    #[serde(default)]
    pub visual: bool,
}

fn default_rocket_location() -> u32 {
    DEFAULT_LOCATION
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            rocket_location: default_rocket_location(),
            visual: false,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/wp-migrator/config.toml
    /// 3. Local config: ./wp-migrator.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::merge_from_file(&system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::merge_from_file(&local_config_path)?;
        }

        config.apply_env_overrides();

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let mut config = Self::merge_from_file(path)?;
        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the system config path: ~/.config/wp-migrator/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wp-migrator").join("config.toml"))
    }

    /// Get the local config path: ./wp-migrator.toml
    fn local_config_path() -> PathBuf {
        PathBuf::from("./wp-migrator.toml")
    }

    // Sections missing from the file fall back to their defaults through
    // `#[serde(default)]`, so a later file only overrides what it names at
    // section granularity.
    fn merge_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MIGRATOR_SERVICE_URL") {
            self.service.base_url = url;
        }

        if let Ok(secs) = std::env::var("MIGRATOR_CONNECT_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(secs) => self.service.connect_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid MIGRATOR_CONNECT_TIMEOUT_SECS: {}", secs),
            }
        }

        if let Ok(log_level) = std::env::var("MIGRATOR_LOG_LEVEL") {
            self.logging.level = log_level;
        }

        if let Ok(log_file) = std::env::var("MIGRATOR_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(log_file));
        }
    }

    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        if !(self.service.base_url.starts_with("http://")
            || self.service.base_url.starts_with("https://"))
        {
            anyhow::bail!(
                "Invalid service base_url: {} (must start with http:// or https://)",
                self.service.base_url
            );
        }

        if !self.service.migrate_path.starts_with('/') {
            anyhow::bail!(
                "Invalid service migrate_path: {} (must start with '/')",
                self.service.migrate_path
            );
        }

        if !LOCATIONS
            .iter()
            .any(|loc| loc.code == self.defaults.rocket_location)
        {
            anyhow::bail!(
                "Unknown default rocket_location: {}",
                self.defaults.rocket_location
            );
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}
