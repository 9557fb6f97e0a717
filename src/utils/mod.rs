//! Utility modules for tasklane.
//!
//! - [`datetime`] - date/time parsing and formatting at the storage boundary

pub mod datetime;
