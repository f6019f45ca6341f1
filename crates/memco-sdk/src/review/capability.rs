//! Scoring capability contract.
//!
//! A capability is any independently invokable scoring source: a local
//! heuristic, a remote model, another agent. The orchestrator imposes the
//! timeout; a capability only has to answer or fail.

use async_trait::async_trait;
use memco_core::{DroppedReview, MemoryType, ReviewKind, ReviewScore};

use crate::error::CapabilityError;

/// What the capability is being asked to judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Storage-time: how valuable is this content as a memory of this type?
    Importance { memory_type: MemoryType },
    /// Retrieval-time: how useful is this stored entry for the given context?
    Relevance {
        memory_type: MemoryType,
        context: String,
    },
}

impl Classification {
    pub fn kind(&self) -> ReviewKind {
        match self {
            Self::Importance { .. } => ReviewKind::Importance,
            Self::Relevance { .. } => ReviewKind::Relevance,
        }
    }

    pub fn memory_type(&self) -> MemoryType {
        match self {
            Self::Importance { memory_type } | Self::Relevance { memory_type, .. } => *memory_type,
        }
    }

    /// Relevance context, if any
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Importance { .. } => None,
            Self::Relevance { context, .. } => Some(context),
        }
    }
}

/// Immutable input shared by every capability in one review.
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    pub content: String,
    pub classification: Classification,
}

/// A capability's answer: a score in 1..=10 and a short rationale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityScore {
    pub score: u8,
    pub rationale: String,
}

impl CapabilityScore {
    pub fn new(score: u8, rationale: impl Into<String>) -> Self {
        Self {
            score,
            rationale: rationale.into(),
        }
    }
}

/// An interchangeable scoring source.
#[async_trait]
pub trait ScoringCapability: Send + Sync {
    /// Stable identifier recorded in reviews and audit entries
    fn id(&self) -> &str;

    /// Score the request or fail. Failing is not the same as scoring low.
    async fn score(&self, request: &ScoringRequest) -> Result<CapabilityScore, CapabilityError>;
}

/// Tagged outcome of one capability invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Success(ReviewScore),
    Timeout { reviewer_id: String, elapsed_ms: u64 },
    Failure { reviewer_id: String, message: String },
}

impl ReviewOutcome {
    pub fn reviewer_id(&self) -> &str {
        match self {
            Self::Success(score) => &score.reviewer_id,
            Self::Timeout { reviewer_id, .. } | Self::Failure { reviewer_id, .. } => reviewer_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The record kept for a dropped outcome; `None` for a success.
    pub fn into_dropped(self) -> Option<DroppedReview> {
        match self {
            Self::Success(_) => None,
            Self::Timeout { reviewer_id, elapsed_ms } => Some(DroppedReview::Timeout { reviewer_id, elapsed_ms }),
            Self::Failure { reviewer_id, message } => Some(DroppedReview::Failure { reviewer_id, message }),
        }
    }
}
