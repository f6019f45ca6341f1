//! Validation Utilities
//!
//! Requests are checked before any I/O so malformed input surfaces
//! synchronously as a [`ValidationError`].

use chrono::Utc;
use memco_core::{RetrievalQuery, StorageRequest, ValidationError, MAX_IMPORTANCE, MIN_IMPORTANCE};

/// Longest accepted entry or session identifier
const MAX_ID_LEN: usize = 128;

/// Validate an importance value
pub fn validate_importance(importance: u8) -> Result<(), ValidationError> {
    if !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&importance) {
        return Err(ValidationError::OutOfRange(format!(
            "importance must be between {MIN_IMPORTANCE} and {MAX_IMPORTANCE}, got {importance}"
        )));
    }
    Ok(())
}

/// Validate an identifier (entry id, session id, task id)
pub fn validate_id(field: &str, id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required(field.into()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::InvalidFormat(format!(
            "{field} must be {MAX_ID_LEN} characters or less"
        )));
    }
    Ok(())
}

/// Validate a storage request
pub fn validate_request(request: &StorageRequest) -> Result<(), ValidationError> {
    if request.content.trim().is_empty() {
        return Err(ValidationError::Required("content".into()));
    }

    if let Some(importance) = request.importance {
        validate_importance(importance)?;
    }

    if let Some(expires_at) = request.expires_at {
        if expires_at <= Utc::now() {
            return Err(ValidationError::OutOfRange(
                "expiresAt must be in the future".into(),
            ));
        }
    }

    if let Some(ref parent_id) = request.parent_id {
        validate_id("parentId", parent_id)?;
    }

    Ok(())
}

/// Validate a retrieval query
pub fn validate_query(query: &RetrievalQuery) -> Result<(), ValidationError> {
    validate_importance(query.min_importance)?;

    if let (Some(after), Some(before)) = (query.created_after, query.created_before) {
        if after >= before {
            return Err(ValidationError::InvalidFormat(
                "createdAfter must be earlier than createdBefore".into(),
            ));
        }
    }

    Ok(())
}
