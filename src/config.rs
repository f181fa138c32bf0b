//! Configuration management for hashledger

use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "hashledger.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file backing the ledger. Unset means an in-memory ledger.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn tracing_level(&self) -> Result<tracing::Level, ChainError> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| ChainError::ConfigError(format!("unknown logging.level '{}'", self.level)))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from `path`. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config_str = match fs::read_to_string(path.as_ref()) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    parse_config(&config_str)
}

pub fn parse_config(config_str: &str) -> Result<Config, ChainError> {
    let config: Config = toml::from_str(config_str)?;

    // Validate critical values
    if matches!(config.database.path.as_deref(), Some("")) {
        return Err(ChainError::ConfigError("database.path must not be empty".to_string()));
    }
    config.logging.tracing_level()?;

    Ok(config)
}
