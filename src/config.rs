use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AnalysisError;
use crate::logging::LogConfig;
use crate::overload::OverloadConfig;
use crate::trends::DEFAULT_WINDOW_DAYS;

/// Environment variable overriding the database path
pub const DATABASE_ENV_VAR: &str = "EQUITRAIN_DATABASE";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Session and analysis storage
    pub database: DatabaseSettings,

    /// Logging output
    pub logging: LogConfig,

    /// Trend windowing
    pub trends: TrendSettings,

    /// Overload rules and model
    pub overload: OverloadConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite database file
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    /// Length of the trailing daily window
    pub window_days: i64,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        ConfigMetadata {
            version: "1.0".to_string(),
            updated_at: Utc::now(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("equitrain")
                .join("equitrain.db"),
        }
    }
}

impl Default for TrendSettings {
    fn default() -> Self {
        TrendSettings {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            metadata: ConfigMetadata::default(),
            database: DatabaseSettings::default(),
            logging: LogConfig::default(),
            trends: TrendSettings::default(),
            overload: OverloadConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".equitrain")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %e,
                    "Config file not usable, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Apply environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
            if !path.trim().is_empty() {
                self.database.path = PathBuf::from(path);
            }
        }
    }

    /// Reject values the analyses cannot run with
    pub fn validate(&self) -> std::result::Result<(), AnalysisError> {
        if self.trends.window_days < 0 {
            return Err(AnalysisError::Configuration(format!(
                "trends.window_days must not be negative, got {}",
                self.trends.window_days
            )));
        }
        self.overload.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.overload, deserialized.overload);
        assert_eq!(config.trends, deserialized.trends);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [trends]
            window_days = 14

            [overload]
            min_records = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.trends.window_days, 14);
        assert_eq!(config.overload.min_records, 8);
        assert_eq!(config.overload.seed, 42);
        assert_eq!(config.overload.forest.n_trees, 100);
        assert_eq!(config.overload.rules.hr_after_max, 150.0);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AppConfig::default();
        original.database.path = temp_dir.path().join("test.db");
        original.overload.forest.max_depth = Some(6);
        original.save_to_file(&config_path).unwrap();

        let loaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.database.path, original.database.path);
        assert_eq!(loaded.overload.forest.max_depth, Some(6));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.trends.window_days = -1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.overload.test_fraction = 1.5;
        assert!(config.validate().is_err());
    }
}
