//! Tasklane - an offline-first personal task manager core
//!
//! This library keeps the user's tasks in a local cache, answers
//! recurrence-aware date queries, partitions tasks into list buckets, and
//! reconciles the cache with a remote document store.
//!
//! # Modules
//!
//! The library is organized into several key modules:
//!
//! * [`model`] - Task and category types
//! * [`recurrence`] - Whether a task occurs on a given day
//! * [`buckets`] - Overdue / today / future / completed-today partitioning
//! * [`cache`] - The in-process task cache and its listeners
//! * [`sync`] - Reconciliation with a remote store
//! * [`backend`] - Remote store interface and implementations
//! * [`config`] - Application configuration management

/// Remote store abstraction and implementations
pub mod backend;

/// List bucketing and sort orders
pub mod buckets;

/// In-process task cache with change notification
pub mod cache;

/// Configuration module for managing application settings
pub mod config;

/// Application constants and default values
pub mod constants;

/// SeaORM entity models for the document tables
pub mod entities;

/// Logging setup and in-memory log buffer
pub mod logger;

/// Domain types
pub mod model;

/// Recurrence-aware date membership
pub mod recurrence;

/// Repository layer for database operations
pub mod repositories;

/// SQLite document database
pub mod storage;

/// Synchronization engine for keeping the cache and the remote store in sync
pub mod sync;

/// Utility functions for date/time handling
pub mod utils;
