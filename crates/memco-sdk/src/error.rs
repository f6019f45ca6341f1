//! SDK Error Types
//!
//! Pipeline and coordinator operations return [`memco_core::Error`]. Scoring
//! capabilities report their own failures through [`CapabilityError`], which
//! never leaves the review orchestrator.

use thiserror::Error;

pub use memco_core::error::{Error, Result, ValidationError};

use crate::config::ConfigValidationError;

/// Failure reported by a single scoring capability.
///
/// A failure is distinct from a low score: the orchestrator drops it from
/// aggregation and counts it against quorum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The scoring source could not be reached
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// The scoring source answered with something unusable
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The scoring source does not handle this classification
    #[error("unsupported classification: {0}")]
    Unsupported(String),

    /// Generic failure
    #[error("{0}")]
    Failed(String),
}

impl CapabilityError {
    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl From<ConfigValidationError> for Error {
    fn from(err: ConfigValidationError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_error_display() {
        let err = CapabilityError::unavailable("scorer offline");
        assert!(err.to_string().contains("scorer offline"));

        let err = CapabilityError::failed("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = ConfigValidationError::InvalidValue {
            field: "review.per_call_timeout_ms".into(),
            message: "must be greater than 0".into(),
        }
        .into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("per_call_timeout_ms"));
    }
}
