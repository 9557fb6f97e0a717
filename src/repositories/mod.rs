//! Repository layer for database operations.
//!
//! Repositories are unit structs whose methods are generic over
//! `ConnectionTrait`, so the same query runs on a plain connection or inside
//! a transaction.

pub mod category_document;
pub mod task_document;

pub use category_document::CategoryDocumentRepository;
pub use task_document::TaskDocumentRepository;
