//! Local persistence for the SQLite document store.

pub mod db;

pub use db::DocumentDb;
