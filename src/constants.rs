//! Constants used throughout the application
//!
//! This module centralizes magic strings, log text, and other constant values
//! to improve maintainability and consistency.

/// Directory name used under the platform config and data directories
pub const APP_DIR: &str = "tasklane";
pub const CONFIG_FILE_NAME: &str = "tasklane.toml";
pub const LOG_FILE_NAME: &str = "tasklane.log";
pub const DATABASE_FILE_NAME: &str = "tasklane.db";

// Remote document paths
pub const USERS_NODE: &str = "users";
pub const TASKS_NODE: &str = "tasks";
pub const CATEGORIES_NODE: &str = "categories";

// Store kinds accepted in configuration
pub const STORE_MEMORY: &str = "memory";
pub const STORE_SQLITE: &str = "sqlite";

// Bucket headers
pub const HEADER_OVERDUE: &str = "⏰ Overdue";
pub const HEADER_TODAY: &str = "📅 Today";
pub const HEADER_FUTURE: &str = "🗓️ Upcoming";
pub const HEADER_COMPLETED_TODAY: &str = "✅ Completed today";

// Log Messages
pub const LOG_SYNC_STARTED: &str = "🔄 Starting sync process...";
pub const LOG_SYNC_DISABLED: &str = "⏸️ Sync disabled, nothing to do";
pub const LOG_PUSH_DONE: &str = "✅ Pushed tasks to remote store";
pub const LOG_PULL_DONE: &str = "✅ Merged remote tasks into cache";
pub const LOG_ERROR_PUSH: &str = "❌ Failed to push tasks";
pub const LOG_ERROR_PULL: &str = "❌ Failed to pull tasks";

// Status messages
pub const CONFIG_GENERATED: &str = "✅ Generated default configuration file";
pub const SYNC_COMPLETED: &str = "✅ Sync completed";
pub const SYNC_FAILED: &str = "❌ Sync failed";
pub const SYNC_CANCELLED: &str = "⚠️ Sync was cancelled before it finished";

/// Maximum number of entries kept in the in-memory log buffer
pub const MAX_LOG_ENTRIES: usize = 500;
/// Upper bound for the auto-sync interval (24 hours)
pub const MAX_AUTO_SYNC_MINUTES: u64 = 1440;
