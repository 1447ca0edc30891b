//! Configuration Loader
//!
//! Loads and validates configuration from TOML files. Every section is
//! optional; anything left out falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::application::{DispatchConfig, EngineConfig};
use crate::domain::{AdmissionConfig, ExitConfig};
use crate::strategy::{EntryConfig, GeometryConfig, LevelConfig, VolatilityConfig};

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub volatility: VolatilityConfig,
    pub levels: LevelConfig,
    pub geometry: GeometryConfig,
    pub entry: EntryConfig,
    pub admission: AdmissionConfig,
    pub exit: ExitConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingSection,
}

/// Logging configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Append lifecycle events as JSON lines to this file
    pub journal_path: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            journal_path: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

fn section<E: std::fmt::Display>(name: &str, result: Result<(), E>) -> Result<(), ConfigError> {
    result.map_err(|e| ConfigError::ValidationError(format!("[{}] {}", name, e)))
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "[engine] channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.engine.entry_persistence_samples == 0 {
            return Err(ConfigError::ValidationError(
                "[engine] entry_persistence_samples must be at least 1".to_string(),
            ));
        }

        section("volatility", self.volatility.validate())?;
        section("levels", self.levels.validate())?;
        section("geometry", self.geometry.validate())?;
        section("entry", self.entry.validate())?;
        section("admission", self.admission.validate())?;
        section("exit", self.exit.validate())?;

        // a reversal must be stronger than the imbalance that opened the position
        if self.exit.reversal_threshold < self.entry.imbalance_threshold {
            return Err(ConfigError::ValidationError(format!(
                "[exit] reversal_threshold {} is below [entry] imbalance_threshold {}",
                self.exit.reversal_threshold, self.entry.imbalance_threshold
            )));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::ValidationError(format!(
                "[logging] unknown level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_config() {
        let file = write(
            r#"
[entry]
imbalance_threshold = 0.2

[exit]
min_hold_secs = 10
persistence_samples = 20

[admission]
max_concurrent = 3
majors = ["BTC", "ETH"]

[logging]
level = "debug"
journal_path = "logs/events.jsonl"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.entry.imbalance_threshold, 0.2);
        assert_eq!(config.exit.min_hold_secs, 10);
        assert_eq!(config.exit.persistence_samples, 20);
        assert_eq!(config.admission.max_concurrent, 3);
        assert_eq!(config.admission.majors.len(), 2);
        assert_eq!(config.logging.journal_path, Some(PathBuf::from("logs/events.jsonl")));
        // untouched sections keep their defaults
        assert_eq!(config.volatility, VolatilityConfig::default());
        assert_eq!(config.dispatch, DispatchConfig::default());
    }

    #[test]
    fn test_shipped_default_matches_builtin_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        assert_eq!(load_config(path).unwrap(), Config::default());
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = write("");
        assert_eq!(load_config(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let file = write("[exit\nmin_hold_secs = 10");
        assert!(matches!(load_config(file.path()).unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_names_section() {
        let file = write("[exit]\nreversal_threshold = 1.5\n");
        match load_config(file.path()).unwrap_err() {
            ConfigError::ValidationError(msg) => assert!(msg.starts_with("[exit]"), "{}", msg),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_reversal_below_entry_threshold_rejected() {
        let mut config = Config::default();
        config.entry.imbalance_threshold = 0.5;
        config.exit.reversal_threshold = 0.3;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
