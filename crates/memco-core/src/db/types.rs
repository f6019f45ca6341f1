//! Database types for memco-core.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DroppedReview, MemoryType, Metadata, ReviewKind, ReviewScore};

// ─────────────────────────────────────────────────────────────────────────────
// Write Types
// ─────────────────────────────────────────────────────────────────────────────

/// A fully resolved entry ready to be written.
///
/// Hashes are computed by the caller so the dedup scope stays a policy
/// decision outside the database layer.
#[derive(Debug, Clone)]
pub struct NewMemoryEntry {
    pub id: String,
    pub session_id: String,
    pub source_agent_id: String,
    pub memory_type: MemoryType,
    pub title: String,
    pub content: String,
    pub metadata: Metadata,
    pub importance: u8,
    pub tags: BTreeSet<String>,
    pub content_hash: String,
    pub dedup_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub parent_id: Option<String>,
}

/// Result of a deduplicating insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written with this id.
    Created(String),
    /// An unexpired entry with the same dedup key already exists.
    Duplicate(String),
}

impl InsertOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Created(id) | Self::Duplicate(id) => id,
        }
    }

    pub fn into_id(self) -> String {
        match self {
            Self::Created(id) | Self::Duplicate(id) => id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Types
// ─────────────────────────────────────────────────────────────────────────────

/// Filter criteria for querying memory entries.
///
/// Expired entries are never returned. Results are ordered by importance,
/// then creation time, then insertion order, all descending.
#[derive(Debug, Clone)]
pub struct MemoryQueryFilter {
    pub memory_type: Option<MemoryType>,
    pub min_importance: u8,
    /// Match entries carrying any of these tags.
    pub tags: Vec<String>,
    /// FTS5 expression over title and content.
    pub fts_query: Option<String>,
    pub session_id: Option<String>,
    pub source_agent_id: Option<String>,
    pub parent_id: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl Default for MemoryQueryFilter {
    fn default() -> Self {
        Self {
            memory_type: None,
            min_importance: crate::types::MIN_IMPORTANCE,
            tags: Vec::new(),
            fts_query: None,
            session_id: None,
            source_agent_id: None,
            parent_id: None,
            created_after: None,
            created_before: None,
            limit: 10,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit Types
// ─────────────────────────────────────────────────────────────────────────────

/// One review, as appended to the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuditRecord {
    pub id: String,
    pub kind: ReviewKind,
    pub memory_type: MemoryType,
    /// Entry under review, for relevance reviews.
    pub subject_id: Option<String>,
    pub input_hash: String,
    /// Raw input, only kept when it is short.
    pub input_excerpt: Option<String>,
    pub scores: Vec<ReviewScore>,
    pub dropped: Vec<DroppedReview>,
    pub average_score: f64,
    pub threshold: f64,
    pub quorum_met: bool,
    pub decision: bool,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Maintenance Types
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of renaming a stored type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMigration {
    /// Rows whose tag was rewritten.
    pub renamed: usize,
    /// Rows folded into an existing canonical entry with identical content.
    pub merged: usize,
}

/// Statistics about stored memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Live (unexpired) entries.
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    /// Expired entries still waiting for the sweeper.
    pub expired_pending: usize,
    pub reviews_passed: usize,
    pub reviews_failed: usize,
}
