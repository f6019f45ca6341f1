//! Coordinator Configuration
//!
//! Defines configuration options for the memory coordinator. Every group has
//! a `Default` so a partial TOML file only needs the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Coordinator configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Path to the SQLite database file (None = auto-detect)
    pub database_path: Option<PathBuf>,

    /// Review orchestration configuration
    pub review: ReviewConfig,

    /// Storage pipeline configuration
    pub storage: StorageConfig,

    /// Retrieval pipeline configuration
    pub retrieval: RetrievalConfig,

    /// Host hook configuration
    pub hooks: HookConfig,

    /// Background maintenance configuration
    pub maintenance: MaintenanceConfig,
}

/// How many capabilities must answer before a review is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum QuorumPolicy {
    /// More than half of the configured capabilities
    #[default]
    Majority,
    /// Every configured capability
    All,
    /// A fixed number of capabilities
    AtLeast { count: usize },
    /// A fraction of the configured capabilities, rounded up
    Fraction { ratio: f64 },
}

impl QuorumPolicy {
    /// Successful responses needed out of `total` capabilities.
    ///
    /// Never returns zero, so an empty capability pool cannot reach quorum.
    pub fn required(&self, total: usize) -> usize {
        let required = match self {
            Self::Majority => total / 2 + 1,
            Self::All => total,
            Self::AtLeast { count } => *count,
            Self::Fraction { ratio } => (total as f64 * ratio).ceil() as usize,
        };
        required.max(1)
    }
}

/// Which fields scope content deduplication (type is always part of the key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// Normalised content hash + type
    #[default]
    Type,
    /// Normalised content hash + type + source agent
    TypeAndSource,
}

/// Review orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Timeout for a single capability call in milliseconds (default: 150)
    pub per_call_timeout_ms: u64,

    /// Quorum policy (default: majority)
    pub quorum: QuorumPolicy,

    /// Average importance a new entry must exceed (default: 4.0)
    pub storage_threshold: f64,

    /// Average relevance a candidate must exceed (default: 7.0)
    pub retrieval_threshold: f64,

    /// Append every review to the audit log (default: true)
    pub audit: bool,

    /// Inputs up to this many characters are kept verbatim in the audit log (default: 256)
    pub audit_excerpt_chars: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            per_call_timeout_ms: 150,
            quorum: QuorumPolicy::Majority,
            storage_threshold: 4.0,
            retrieval_threshold: 7.0,
            audit: true,
            audit_excerpt_chars: 256,
        }
    }
}

impl ReviewConfig {
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_millis(self.per_call_timeout_ms)
    }

    /// Check that a pool of `pool` capabilities can reach quorum.
    ///
    /// An empty pool is accepted: it rejects every review but still allows
    /// stores with an explicit importance.
    pub fn validate_pool(&self, pool: usize) -> Result<(), ConfigValidationError> {
        if pool > 0 && self.quorum.required(pool) > pool {
            return Err(invalid(
                "review.quorum",
                &format!(
                    "needs {} responses but only {pool} capabilities are configured",
                    self.quorum.required(pool)
                ),
            ));
        }
        Ok(())
    }
}

/// Storage pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Deadline for the importance review in milliseconds (default: 450)
    pub review_budget_ms: u64,

    /// TTL applied to WORKING entries stored without an expiry (default: 86400 = 24 hours)
    pub working_ttl_secs: Option<u64>,

    /// Deduplication scope (default: type)
    pub dedup_scope: DedupScope,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            review_budget_ms: 450,
            working_ttl_secs: Some(86_400), // 24 hours
            dedup_scope: DedupScope::Type,
        }
    }
}

impl StorageConfig {
    pub fn review_budget(&self) -> Duration {
        Duration::from_millis(self.review_budget_ms)
    }

    pub fn working_ttl(&self) -> Option<Duration> {
        self.working_ttl_secs.map(Duration::from_secs)
    }
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Limit used when a query asks for 0 entries (default: 10)
    pub default_limit: usize,

    /// Upper bound on any query limit (default: 100)
    pub max_limit: usize,

    /// Candidates re-scored by the smart path (default: 20)
    pub candidate_limit: usize,

    /// Deadline for the relevance review in milliseconds (default: 250)
    pub review_budget_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            candidate_limit: 20,
            review_budget_ms: 250,
        }
    }
}

impl RetrievalConfig {
    pub fn review_budget(&self) -> Duration {
        Duration::from_millis(self.review_budget_ms)
    }

    /// Resolve a requested limit: 0 means the default, anything else is capped.
    pub fn effective_limit(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_limit
        } else {
            requested.min(self.max_limit)
        }
    }
}

/// Host hook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Budget for the pre-turn hook in milliseconds (default: 300)
    pub prompt_budget_ms: u64,

    /// Entries returned by the pre-turn hook (default: 5)
    pub max_entries: usize,

    /// Total title + content characters returned by the pre-turn hook (default: 4000)
    pub max_total_chars: usize,

    /// Budget for the end-of-session hook in milliseconds (default: 5000)
    pub session_budget_ms: u64,

    /// Budget for the end-of-task hook in milliseconds (default: 2000)
    pub task_budget_ms: u64,

    /// Clear working memory when a task completes (default: true)
    pub clear_working_on_task_complete: bool,

    /// Directory holding `<session_id>.{md,txt,jsonl}` transcripts
    pub transcripts_dir: Option<PathBuf>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            prompt_budget_ms: 300,
            max_entries: 5,
            max_total_chars: 4000,
            session_budget_ms: 5000,
            task_budget_ms: 2000,
            clear_working_on_task_complete: true,
            transcripts_dir: None,
        }
    }
}

impl HookConfig {
    pub fn prompt_budget(&self) -> Duration {
        Duration::from_millis(self.prompt_budget_ms)
    }

    pub fn session_budget(&self) -> Duration {
        Duration::from_millis(self.session_budget_ms)
    }

    pub fn task_budget(&self) -> Duration {
        Duration::from_millis(self.task_budget_ms)
    }
}

/// Background maintenance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Sweep expired entries in the background (default: true)
    pub auto_sweep: bool,

    /// Sweep interval in seconds (default: 300 = 5 minutes)
    pub sweep_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            auto_sweep: true,
            sweep_interval_secs: 300, // 5 minutes
        }
    }
}

impl MaintenanceConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl CoordinatorConfig {
    /// Create a config for the given database path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(database_path.into()),
            ..Default::default()
        }
    }

    /// Set review configuration
    pub fn with_review(mut self, review: ReviewConfig) -> Self {
        self.review = review;
        self
    }

    /// Set storage configuration
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Set retrieval configuration
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Set hook configuration
    pub fn with_hooks(mut self, hooks: HookConfig) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set maintenance configuration
    pub fn with_maintenance(mut self, maintenance: MaintenanceConfig) -> Self {
        self.maintenance = maintenance;
        self
    }

    /// Set the quorum policy
    pub fn with_quorum(mut self, quorum: QuorumPolicy) -> Self {
        self.review.quorum = quorum;
        self
    }

    /// Set the dedup scope
    pub fn with_dedup_scope(mut self, scope: DedupScope) -> Self {
        self.storage.dedup_scope = scope;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let review = &self.review;
        positive("review.per_call_timeout_ms", review.per_call_timeout_ms)?;
        threshold("review.storage_threshold", review.storage_threshold)?;
        threshold("review.retrieval_threshold", review.retrieval_threshold)?;
        if review.storage_threshold >= review.retrieval_threshold {
            return Err(ConfigValidationError::ThresholdOrder {
                storage: review.storage_threshold,
                retrieval: review.retrieval_threshold,
            });
        }
        match review.quorum {
            QuorumPolicy::AtLeast { count } if count == 0 => {
                return Err(invalid("review.quorum.count", "must be greater than 0"));
            }
            QuorumPolicy::Fraction { ratio } if !(ratio > 0.0 && ratio <= 1.0) => {
                return Err(invalid("review.quorum.ratio", "must be in (0, 1]"));
            }
            _ => {}
        }

        positive("storage.review_budget_ms", self.storage.review_budget_ms)?;
        if self.storage.working_ttl_secs == Some(0) {
            return Err(invalid("storage.working_ttl_secs", "must be greater than 0 when set"));
        }

        let retrieval = &self.retrieval;
        positive("retrieval.default_limit", retrieval.default_limit as u64)?;
        positive("retrieval.review_budget_ms", retrieval.review_budget_ms)?;
        if retrieval.max_limit < retrieval.default_limit {
            return Err(invalid("retrieval.max_limit", "must be at least retrieval.default_limit"));
        }
        if retrieval.candidate_limit < retrieval.default_limit {
            return Err(invalid(
                "retrieval.candidate_limit",
                "must be at least retrieval.default_limit",
            ));
        }

        let hooks = &self.hooks;
        positive("hooks.prompt_budget_ms", hooks.prompt_budget_ms)?;
        positive("hooks.max_entries", hooks.max_entries as u64)?;
        positive("hooks.max_total_chars", hooks.max_total_chars as u64)?;
        positive("hooks.session_budget_ms", hooks.session_budget_ms)?;
        positive("hooks.task_budget_ms", hooks.task_budget_ms)?;

        if self.maintenance.auto_sweep {
            positive("maintenance.sweep_interval_secs", self.maintenance.sweep_interval_secs)?;
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

fn positive(field: &str, value: u64) -> Result<(), ConfigValidationError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than 0"));
    }
    Ok(())
}

fn threshold(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if !(1.0..10.0).contains(&value) {
        return Err(invalid(field, "must be in [1, 10)"));
    }
    Ok(())
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("storage_threshold ({storage}) must be below retrieval_threshold ({retrieval})")]
    ThresholdOrder { storage: f64, retrieval: f64 },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
