//! memco-core - Core library for memco
//!
//! This crate provides the pieces shared by the memco SDK and the `memco` CLI:
//!
//! - **types**: memory entries, request DTOs and review results
//! - **db**: SQLite persistence store with full-text search and a review audit log
//! - **error**: error taxonomy shared by every layer

pub mod db;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use db::Database;
pub use error::{Error, Result, ValidationError};
pub use types::{
    DroppedReview, MemoryEntry, MemoryType, Metadata, RetrievalQuery, ReviewKind, ReviewResult,
    ReviewScore, StorageRequest, MAX_IMPORTANCE, MIN_IMPORTANCE,
};
