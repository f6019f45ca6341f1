//! Error types for memco-core.

use thiserror::Error;

/// Result type alias using memco-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed input rejected before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field required: {0}")]
    Required(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Unknown memory type: {0}")]
    UnknownType(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Core error types for memco operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database not found. Set MEMCO_DATABASE_PATH or create ~/.memco/memco.db")]
    DatabaseNotFound,

    #[error("Database lock poisoned")]
    LockPoisoned,

    // Pipeline-level persistence failures
    #[error("Storage error: {0}")]
    Storage(Box<Error>),

    #[error("Retrieval error: {0}")]
    Retrieval(Box<Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Background task failures (panicked or cancelled blocking work)
    #[error("Task error: {0}")]
    Task(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a persistence failure raised while storing an entry.
    pub fn storage(err: Error) -> Self {
        match err {
            Self::Storage(_) | Self::Validation(_) => err,
            other => Self::Storage(Box::new(other)),
        }
    }

    /// Wrap a persistence failure raised while retrieving entries.
    pub fn retrieval(err: Error) -> Self {
        match err {
            Self::Retrieval(_) | Self::Validation(_) => err,
            other => Self::Retrieval(Box::new(other)),
        }
    }

    /// Check if this error is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error is a storage error
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Check if this error is a retrieval error
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::Retrieval(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_wrapping() {
        let err = Error::storage(Error::LockPoisoned);
        assert!(err.is_storage());
        assert!(err.to_string().contains("lock poisoned"));

        // Already wrapped errors are not wrapped twice
        let err = Error::storage(err);
        assert!(matches!(err, Error::Storage(inner) if matches!(*inner, Error::LockPoisoned)));
    }

    #[test]
    fn test_validation_passes_through() {
        let err = Error::retrieval(ValidationError::Required("content".into()).into());
        assert!(err.is_validation());
        assert!(!err.is_retrieval());
    }
}
