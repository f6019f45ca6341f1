//! Shared types for memco-core.
//!
//! These types are used by the persistence layer, the pipelines in memco-sdk
//! and the `memco` binary.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest importance an entry may carry.
pub const MIN_IMPORTANCE: u8 = 1;

/// Highest importance an entry may carry.
pub const MAX_IMPORTANCE: u8 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Memory Types
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic classification of a memory entry.
///
/// The type is fixed when an entry is created. `Working` entries are
/// temporary: they either expire or are removed in bulk when a task ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Something that happened: an event, an observation, an outcome.
    #[serde(alias = "EPISODIC")]
    Episodic,
    /// A fact, convention or decision that holds independent of when it was learned.
    #[serde(alias = "SEMANTIC")]
    Semantic,
    /// An intention or reminder about something to do later.
    #[serde(alias = "PROSPECTIVE")]
    Prospective,
    /// How to do something: steps, commands, recipes.
    #[serde(alias = "PROCEDURAL")]
    Procedural,
    /// Scratch context for the task in progress.
    #[serde(alias = "WORKING")]
    Working,
}

/// Stored type tags from earlier schemas and the canonical type they map to.
pub const LEGACY_TYPE_MAPPINGS: &[(&str, MemoryType)] = &[
    ("short_term", MemoryType::Episodic),
    ("observation", MemoryType::Episodic),
    ("command", MemoryType::Episodic),
    ("tool_result", MemoryType::Episodic),
    ("long_term", MemoryType::Semantic),
    ("convention", MemoryType::Semantic),
    ("pattern", MemoryType::Semantic),
    ("gotcha", MemoryType::Semantic),
    ("knowledge", MemoryType::Semantic),
    ("skill", MemoryType::Procedural),
    ("procedure", MemoryType::Procedural),
    ("plan", MemoryType::Prospective),
    ("intention", MemoryType::Prospective),
    ("reminder", MemoryType::Prospective),
    ("file_context", MemoryType::Working),
    ("hypothesis", MemoryType::Working),
    ("scratch", MemoryType::Working),
];

impl MemoryType {
    /// All canonical types, in declaration order.
    pub const ALL: [MemoryType; 5] = [
        MemoryType::Episodic,
        MemoryType::Semantic,
        MemoryType::Prospective,
        MemoryType::Procedural,
        MemoryType::Working,
    ];

    /// Convert to the tag stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Prospective => "prospective",
            Self::Procedural => "procedural",
            Self::Working => "working",
        }
    }

    /// Whether entries of this type are removed in bulk at task completion.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Working)
    }

    /// Whether a stored tag is one of the five canonical tags.
    pub fn is_canonical_tag(tag: &str) -> bool {
        Self::ALL.iter().any(|t| t.as_str() == tag)
    }

    /// Look up the canonical type for a legacy tag.
    pub fn from_legacy(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        LEGACY_TYPE_MAPPINGS
            .iter()
            .find(|(legacy, _)| *legacy == tag)
            .map(|(_, ty)| *ty)
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "episodic" => Ok(Self::Episodic),
            "semantic" => Ok(Self::Semantic),
            "prospective" => Ok(Self::Prospective),
            "procedural" => Ok(Self::Procedural),
            "working" => Ok(Self::Working),
            _ => Err(ValidationError::UnknownType(s.to_string())),
        }
    }
}

/// Opaque caller-supplied metadata.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A persisted unit of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub id: String,
    pub session_id: String,
    pub source_agent_id: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub importance: u8,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub parent_id: Option<String>,
}

impl MemoryEntry {
    /// Whether the entry is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Text handed to scoring capabilities: title and content.
    pub fn review_text(&self) -> String {
        review_text(&self.title, &self.content)
    }

    /// Approximate size of the entry when injected into a prompt.
    pub fn char_len(&self) -> usize {
        self.title.chars().count() + self.content.chars().count()
    }
}

/// Join a title and body the way every review sees them.
pub fn review_text(title: &str, content: &str) -> String {
    if title.trim().is_empty() {
        content.to_string()
    } else {
        format!("{}\n\n{}", title.trim(), content)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Input DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to store a new entry. Never persisted itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub source_agent_id: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Known importance; when present the review is skipped.
    #[serde(default)]
    pub importance: Option<u8>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl StorageRequest {
    /// Create a request with the required fields
    pub fn new(memory_type: MemoryType, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: String::new(),
            source_agent_id: String::new(),
            memory_type,
            title: title.into(),
            content: content.into(),
            metadata: Metadata::new(),
            importance: None,
            tags: BTreeSet::new(),
            expires_at: None,
            parent_id: None,
        }
    }

    /// Set the session the entry was produced in
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Set the agent that produced the entry
    pub fn with_source_agent(mut self, source_agent_id: impl Into<String>) -> Self {
        self.source_agent_id = source_agent_id.into();
        self
    }

    /// Supply a known importance and bypass the review
    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Add tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set an explicit expiry
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set an expiry relative to now
    pub fn with_ttl(self, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.with_expires_at(expires_at)
    }

    /// Group under a parent entry
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Attach a metadata value
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Text handed to scoring capabilities
    pub fn review_text(&self) -> String {
        review_text(&self.title, &self.content)
    }
}

/// Query over stored entries. Never persisted itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalQuery {
    #[serde(rename = "type")]
    pub memory_type: Option<MemoryType>,
    pub min_importance: u8,
    /// Entries carrying any of these tags.
    pub tags: Vec<String>,
    /// Full-text filter over title and content.
    pub text: Option<String>,
    /// Maximum entries returned; 0 means the configured default.
    pub limit: usize,
    /// Relevance context for the smart path.
    pub context: Option<String>,
    pub session_id: Option<String>,
    pub source_agent_id: Option<String>,
    pub parent_id: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl Default for RetrievalQuery {
    fn default() -> Self {
        Self {
            memory_type: None,
            min_importance: MIN_IMPORTANCE,
            tags: Vec::new(),
            text: None,
            limit: 0,
            context: None,
            session_id: None,
            source_agent_id: None,
            parent_id: None,
            created_after: None,
            created_before: None,
        }
    }
}

impl RetrievalQuery {
    /// Query everything, newest and most important first
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one type
    pub fn of_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    /// Require a minimum importance
    pub fn min_importance(mut self, min_importance: u8) -> Self {
        self.min_importance = min_importance;
        self
    }

    /// Require any of the given tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Full-text filter
    pub fn matching(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Cap the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Relevance context for the smart path
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Only entries created at or after `after`
    pub fn since(mut self, after: DateTime<Utc>) -> Self {
        self.created_after = Some(after);
        self
    }

    /// Only entries created before `before`
    pub fn until(mut self, before: DateTime<Utc>) -> Self {
        self.created_before = Some(before);
        self
    }

    /// Restrict to one session
    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Restrict to one producing agent
    pub fn from_agent(mut self, source_agent_id: impl Into<String>) -> Self {
        self.source_agent_id = Some(source_agent_id.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Review Types
// ─────────────────────────────────────────────────────────────────────────────

/// What a review is deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    /// Storage-time: is this worth keeping?
    Importance,
    /// Retrieval-time: does this help with the current context?
    Relevance,
}

impl ReviewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Importance => "importance",
            Self::Relevance => "relevance",
        }
    }
}

impl fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One capability's successful score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewScore {
    pub reviewer_id: String,
    pub score: u8,
    pub rationale: String,
    pub elapsed_ms: u64,
}

/// Why a capability's result was left out of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum DroppedReview {
    Timeout { reviewer_id: String, elapsed_ms: u64 },
    Failure { reviewer_id: String, message: String },
}

impl DroppedReview {
    pub fn reviewer_id(&self) -> &str {
        match self {
            Self::Timeout { reviewer_id, .. } | Self::Failure { reviewer_id, .. } => reviewer_id,
        }
    }
}

/// Aggregated outcome of one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub kind: ReviewKind,
    pub scores: Vec<ReviewScore>,
    pub average_score: f64,
    pub decision: bool,
    pub threshold: f64,
    pub quorum_met: bool,
    pub reviewers: usize,
    #[serde(default)]
    pub dropped: Vec<DroppedReview>,
}

impl ReviewResult {
    /// Importance derived from a passing review, clamped to the valid range.
    pub fn importance(&self) -> u8 {
        let rounded = self.average_score.round();
        if rounded.is_nan() {
            return MIN_IMPORTANCE;
        }
        (rounded as i64).clamp(MIN_IMPORTANCE as i64, MAX_IMPORTANCE as i64) as u8
    }
}
