//! SDK Utilities
//!
//! Hashing, time and validation helpers shared by the pipelines.

mod hashing;
mod time;
mod validation;

pub use hashing::{content_hash, dedup_hash, normalize_content};
pub use time::{elapsed_ms, expires_in, parse_datetime, parse_duration};
pub use validation::{validate_id, validate_importance, validate_query, validate_request};
