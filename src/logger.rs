use anyhow::{Context, Result};
use chrono::Local;
use log::LevelFilter;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::config::LoggingConfig;
use crate::constants::{APP_DIR, LOG_FILE_NAME, MAX_LOG_ENTRIES};

/// Shared logger that can be used across the application
///
/// Keeps the most recent entries in memory and, once installed, receives
/// every `log` record through a `fern` dispatcher that also writes them to
/// the log file.
#[derive(Clone)]
pub struct Logger {
    logs: Arc<Mutex<VecDeque<String>>>,
    enabled: bool,
    level: LevelFilter,
    file: Option<PathBuf>,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            logs: Arc::new(Mutex::new(VecDeque::new())),
            enabled: false,
            level: LevelFilter::Info,
            file: None,
        }
    }

    /// Build a logger from configuration. Disabled logging has no file.
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        let level = LevelFilter::from_str(&config.level)
            .with_context(|| format!("Invalid logging level '{}'", config.level))?;

        let file = if config.enabled {
            Some(match &config.file {
                Some(path) => PathBuf::from(path),
                None => Self::get_log_file_path()?,
            })
        } else {
            None
        };

        Ok(Self {
            logs: Arc::new(Mutex::new(VecDeque::new())),
            enabled: config.enabled,
            level,
            file,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn log_file(&self) -> Option<&PathBuf> {
        self.file.as_ref()
    }

    /// Add a log entry
    pub fn log(&self, message: impl Into<String>) {
        push_entry(&self.logs, message.into());
    }

    /// Get all logs sorted by date (newest first)
    pub fn get_logs(&self) -> Vec<String> {
        if let Ok(logs) = self.logs.lock() {
            logs.iter().rev().cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Clear all logs
    pub fn clear(&self) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.clear();
        }
    }

    /// Install this logger as the global `log` backend.
    ///
    /// Does nothing when logging is disabled. Fails if a global logger was
    /// already installed.
    pub fn install(&self) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let buffer = Arc::clone(&self.logs);
        fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {} {}] {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(self.level)
            // sqlx logs every statement at info
            .level_for("sqlx", LevelFilter::Warn)
            .chain(fern::log_file(path).with_context(|| format!("Failed to open log file: {}", path.display()))?)
            .chain(fern::Output::call(move |record| {
                push_entry(&buffer, format!("{} {}", record.level(), record.args()));
            }))
            .apply()
            .context("A global logger is already installed")?;

        Ok(())
    }

    /// Default log file location under the platform data directory
    pub fn get_log_file_path() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR).join(LOG_FILE_NAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

fn push_entry(logs: &Mutex<VecDeque<String>>, message: String) {
    let timestamp = Local::now().format("%H:%M:%S%.3f").to_string();
    if let Ok(mut logs) = logs.lock() {
        if logs.len() == MAX_LOG_ENTRIES {
            logs.pop_front();
        }
        logs.push_back(format!("[{}] {}", timestamp, message));
    }
}

/// Configure logging from settings and install it globally.
pub fn init(config: &LoggingConfig) -> Result<Logger> {
    let logger = Logger::from_config(config)?;
    logger.install()?;
    Ok(logger)
}
