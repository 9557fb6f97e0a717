//! Configuration management for Tasklane
//!
//! This module handles loading, parsing, and validation of configuration files.

use crate::buckets::SortOrder;
use crate::cache::MergePolicy;
use crate::constants::{
    APP_DIR, CONFIG_FILE_NAME, CONFIG_GENERATED, DATABASE_FILE_NAME, MAX_AUTO_SYNC_MINUTES, STORE_MEMORY, STORE_SQLITE,
};
use crate::utils::datetime;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Master switch for remote synchronization
    pub enabled: bool,
    /// Stable identifier of the signed-in user (e.g. an email address)
    pub user_id: Option<String>,
    /// Remote store kind: "sqlite" or "memory"
    pub store: String,
    /// SQLite database path (defaults to the platform data directory)
    pub database_path: Option<String>,
    /// Merge policy: "local_wins" or "last_modified_wins"
    pub merge_policy: String,
    /// Auto-sync interval in minutes (0 = disabled, manual sync only)
    pub auto_sync_interval_minutes: u64,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Task list order: "date_time", "creation_time" or "alphabetical"
    pub sort_order: String,
    /// Date format for task due dates
    pub date_format: String,
    /// Time format for due times
    pub time_format: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Maximum level: "error", "warn", "info", "debug" or "trace"
    pub level: String,
    /// Log file path (defaults to the platform data directory)
    pub file: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_id: None,
            store: STORE_SQLITE.to_string(),
            database_path: None,
            merge_policy: "local_wins".to_string(),
            auto_sync_interval_minutes: 5,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::default().value().to_string(),
            date_format: datetime::STORAGE_DATE_FORMAT.to_string(),
            time_format: datetime::STORAGE_TIME_FORMAT.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file()?;

        if let Some(path) = config_path {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Result<Option<PathBuf>> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return Ok(Some(current_dir_config));
        }

        // 2. Check XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join(APP_DIR).join("config.toml");
            if xdg_config.exists() {
                return Ok(Some(xdg_config));
            }
        }

        Ok(None)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate sync settings
        if self.sync.store != STORE_SQLITE && self.sync.store != STORE_MEMORY {
            anyhow::bail!(
                "store must be '{}' or '{}', got '{}'",
                STORE_SQLITE,
                STORE_MEMORY,
                self.sync.store
            );
        }

        if MergePolicy::parse(&self.sync.merge_policy).is_none() {
            anyhow::bail!(
                "merge_policy must be 'local_wins' or 'last_modified_wins', got '{}'",
                self.sync.merge_policy
            );
        }

        if self.sync.auto_sync_interval_minutes > MAX_AUTO_SYNC_MINUTES {
            anyhow::bail!("auto_sync_interval_minutes cannot exceed 1440 (24 hours)");
        }

        if self.sync.enabled && self.sync.user_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            anyhow::bail!("user_id cannot be blank when sync is enabled");
        }

        // Validate display settings
        if SortOrder::parse(&self.display.sort_order).is_none() {
            anyhow::bail!(
                "sort_order must be 'date_time', 'creation_time' or 'alphabetical', got '{}'",
                self.display.sort_order
            );
        }

        if let Err(e) = chrono::NaiveDate::parse_from_str("2025/01/01", &self.display.date_format)
            .or_else(|_| chrono::NaiveDate::parse_from_str("2025-01-01", &self.display.date_format))
        {
            anyhow::bail!("Invalid date_format '{}': {}", self.display.date_format, e);
        }

        if let Err(e) = chrono::NaiveTime::parse_from_str("12:00", &self.display.time_format) {
            anyhow::bail!("Invalid time_format '{}': {}", self.display.time_format, e);
        }

        // Validate logging settings
        if log::LevelFilter::from_str(&self.logging.level).is_err() {
            anyhow::bail!("Invalid logging level '{}'", self.logging.level);
        }

        Ok(())
    }

    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy::parse(&self.sync.merge_policy).unwrap_or_default()
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from_value(&self.display.sort_order)
    }

    /// SQLite database path, falling back to the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.sync.database_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => dirs::data_local_dir()
                .map(|dir| dir.join(APP_DIR).join(DATABASE_FILE_NAME))
                .ok_or_else(|| anyhow::anyhow!("Could not determine data directory")),
        }
    }

    /// Generate default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        // Add header comment
        let header = format!(
            "# Tasklane Configuration File\n# Generated on {}\n\n",
            datetime::format_today()
        );

        let full_content = header + &toml_content;

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(&path, full_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        println!("{}: {}", CONFIG_GENERATED, path.as_ref().display());
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn get_xdg_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
            .map(|dir| dir.join(APP_DIR))
    }

    /// Get the default config file path
    pub fn get_default_config_path() -> Result<PathBuf> {
        Ok(Self::get_xdg_config_dir()?.join("config.toml"))
    }
}
