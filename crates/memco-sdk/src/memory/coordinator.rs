//! Memory Coordinator
//!
//! The facade callers hold. It owns the store, the review orchestrator and
//! both pipelines, and adds the maintenance operations around them.

use std::sync::{Arc, Mutex};

use memco_core::db::{InsertOutcome, MemoryStats, ReviewAuditRecord, TypeMigration};
use memco_core::{Database, MemoryEntry, MemoryType, RetrievalQuery, StorageRequest, ValidationError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::retrieval::{RankedEntry, RetrievalPipeline};
use super::storage::StoragePipeline;
use super::store::MemoryStore;
use crate::config::CoordinatorConfig;
use crate::error::{Error, Result};
use crate::review::{builtin_capabilities, ReviewOrchestrator, ScoringCapability};
use crate::utils::validate_id;

/// Multi-type memory coordinator.
///
/// # Example
///
/// ```rust,no_run
/// use memco_sdk::{CoordinatorConfig, MemoryCoordinator};
/// use memco_core::{MemoryType, RetrievalQuery, StorageRequest};
///
/// async fn example() -> memco_core::Result<()> {
///     let coordinator = MemoryCoordinator::open(CoordinatorConfig::new("memco.db"))?;
///
///     let request = StorageRequest::new(MemoryType::Semantic, "Formatting", "Always run cargo fmt");
///     if let Some(id) = coordinator.store(request).await? {
///         println!("stored {id}");
///     }
///
///     let hits = coordinator
///         .retrieve_with_context(&RetrievalQuery::new(), "how do we format code?")
///         .await?;
///     println!("{} relevant entries", hits.len());
///     Ok(())
/// }
/// ```
pub struct MemoryCoordinator {
    config: CoordinatorConfig,
    store: MemoryStore,
    orchestrator: Arc<ReviewOrchestrator>,
    storage: StoragePipeline,
    retrieval: RetrievalPipeline,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryCoordinator {
    /// Create a coordinator over an open database and a capability pool
    pub fn new(
        db: Arc<Database>,
        capabilities: Vec<Arc<dyn ScoringCapability>>,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        config.review.validate_pool(capabilities.len())?;
        if capabilities.is_empty() {
            warn!("No scoring capabilities configured, only explicit-importance stores will succeed");
        }

        let store = MemoryStore::new(db);
        let mut orchestrator = ReviewOrchestrator::new(capabilities, config.review.clone());
        if config.review.audit {
            orchestrator = orchestrator.with_audit(Arc::new(store.clone()));
        }
        let orchestrator = Arc::new(orchestrator);

        Ok(Self {
            storage: StoragePipeline::new(store.clone(), Arc::clone(&orchestrator), config.storage.clone()),
            retrieval: RetrievalPipeline::new(store.clone(), Arc::clone(&orchestrator), config.retrieval.clone()),
            store,
            orchestrator,
            config,
            sweeper: Mutex::new(None),
        })
    }

    /// Open the configured database with the built-in capabilities
    pub fn open(config: CoordinatorConfig) -> Result<Self> {
        Self::open_with(config, builtin_capabilities())
    }

    /// Open the configured database with a custom capability pool
    pub fn open_with(config: CoordinatorConfig, capabilities: Vec<Arc<dyn ScoringCapability>>) -> Result<Self> {
        let db = match config.database_path {
            Some(ref path) => Database::open_path(path)?,
            None => Database::open()?,
        };
        Self::new(Arc::new(db), capabilities, config)
    }

    /// Coordinator over a private in-memory database
    pub fn in_memory(capabilities: Vec<Arc<dyn ScoringCapability>>, config: CoordinatorConfig) -> Result<Self> {
        Self::new(Arc::new(Database::open_in_memory()?), capabilities, config)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &ReviewOrchestrator {
        &self.orchestrator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Storage & Retrieval
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an entry. `None` means the review rejected it.
    pub async fn store(&self, request: StorageRequest) -> Result<Option<String>> {
        self.storage.process(request).await
    }

    /// Store an entry, reporting whether it was new or a duplicate.
    pub async fn store_outcome(&self, request: StorageRequest) -> Result<Option<InsertOutcome>> {
        self.storage.process_outcome(request).await
    }

    /// Fast filtered retrieval without scoring
    pub async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<MemoryEntry>> {
        self.retrieval.query(query).await
    }

    /// Relevance-reviewed retrieval against a context string
    pub async fn retrieve_with_context(&self, query: &RetrievalQuery, context: &str) -> Result<Vec<MemoryEntry>> {
        self.retrieval.query_with_context(query, context).await
    }

    /// Relevance-reviewed retrieval keeping each entry's relevance average
    pub async fn retrieve_ranked(&self, query: &RetrievalQuery, context: &str) -> Result<Vec<RankedEntry>> {
        self.retrieval.query_ranked(query, context).await
    }

    /// Get a live entry by ID
    pub async fn get(&self, id: &str) -> Result<Option<MemoryEntry>> {
        validate_id("id", id)?;
        self.store.get(id).await.map_err(Error::retrieval)
    }

    /// Delete one entry. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        validate_id("id", id)?;
        let deleted = self.store.delete(id).await.map_err(Error::storage)?;
        if deleted {
            info!(id = %id, "Deleted memory entry");
        }
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove every WORKING entry. Returns the exact count removed.
    pub async fn clear_working_memory(&self) -> Result<usize> {
        let removed = self
            .store
            .delete_by_type(MemoryType::Working)
            .await
            .map_err(Error::storage)?;
        info!(removed, "Cleared working memory");
        Ok(removed)
    }

    /// Remove expired entries now
    pub async fn sweep_expired(&self) -> Result<usize> {
        let removed = self.store.sweep_expired().await.map_err(Error::storage)?;
        if removed > 0 {
            info!(removed, "Swept expired memory entries");
        }
        Ok(removed)
    }

    /// Rename a non-canonical stored type tag to a canonical type
    pub async fn migrate_legacy_type(&self, from: &str, to: MemoryType) -> Result<TypeMigration> {
        let from = from.trim();
        if from.is_empty() {
            return Err(ValidationError::Required("from".into()).into());
        }
        if MemoryType::is_canonical_tag(from) {
            return Err(ValidationError::InvalidFormat(format!(
                "'{from}' is already a canonical type and cannot be renamed"
            ))
            .into());
        }

        let result = self.store.rename_type(from, to).await.map_err(Error::storage)?;
        info!(from = %from, to = %to, renamed = result.renamed, merged = result.merged, "Migrated memory type");
        Ok(result)
    }

    /// Memory statistics
    pub async fn stats(&self) -> Result<MemoryStats> {
        self.store.stats().await.map_err(Error::retrieval)
    }

    /// Most recent review audit records
    pub async fn recent_reviews(&self, limit: usize) -> Result<Vec<ReviewAuditRecord>> {
        self.store.recent_reviews(limit).await.map_err(Error::retrieval)
    }

    /// Start sweeping expired entries in the background.
    ///
    /// Must be called from within a tokio runtime. Does nothing when automatic
    /// sweeping is disabled or a sweeper is already running.
    pub fn start_sweeper(&self) -> Result<bool> {
        if !self.config.maintenance.auto_sweep {
            return Ok(false);
        }

        let mut sweeper = self.sweeper.lock().map_err(|_| Error::LockPoisoned)?;
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(false);
        }

        let store = self.store.clone();
        let period = self.config.maintenance.sweep_interval();
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match store.sweep_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Background sweep removed expired entries"),
                    Err(err) => warn!(error = %err, "Background sweep failed"),
                }
            }
        }));

        info!(interval_seconds = period.as_secs(), "Started background sweeper");
        Ok(true)
    }

    /// Stop the background sweeper
    pub fn stop_sweeper(&self) -> Result<bool> {
        let mut sweeper = self.sweeper.lock().map_err(|_| Error::LockPoisoned)?;
        match sweeper.take() {
            Some(handle) => {
                handle.abort();
                info!("Stopped background sweeper");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Drop for MemoryCoordinator {
    fn drop(&mut self) {
        if let Ok(mut sweeper) = self.sweeper.lock() {
            if let Some(handle) = sweeper.take() {
                handle.abort();
            }
        }
    }
}
