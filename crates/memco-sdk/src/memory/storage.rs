//! Storage pipeline: review, then a single deduplicating write.

use std::sync::Arc;

use chrono::Utc;
use memco_core::db::{InsertOutcome, NewMemoryEntry};
use memco_core::StorageRequest;
use tracing::{debug, info};
use uuid::Uuid;

use super::store::MemoryStore;
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::review::ReviewOrchestrator;
use crate::utils::{content_hash, dedup_hash, expires_in, validate_request};

/// Accepts storage requests and commits the ones worth keeping.
pub struct StoragePipeline {
    store: MemoryStore,
    orchestrator: Arc<ReviewOrchestrator>,
    config: StorageConfig,
}

impl StoragePipeline {
    pub fn new(store: MemoryStore, orchestrator: Arc<ReviewOrchestrator>, config: StorageConfig) -> Self {
        Self {
            store,
            orchestrator,
            config,
        }
    }

    /// Store a request. Returns the entry id, or `None` when the review rejected it.
    ///
    /// A duplicate of a live entry returns that entry's id.
    pub async fn process(&self, request: StorageRequest) -> Result<Option<String>> {
        Ok(self.process_outcome(request).await?.map(InsertOutcome::into_id))
    }

    /// Like [`process`](Self::process) but tells a new entry apart from a duplicate.
    pub async fn process_outcome(&self, request: StorageRequest) -> Result<Option<InsertOutcome>> {
        validate_request(&request)?;

        let importance = match request.importance {
            Some(importance) => {
                debug!(memory_type = %request.memory_type, importance, "Explicit importance, skipping review");
                importance
            }
            None => {
                let review = self
                    .orchestrator
                    .review_importance(&request.review_text(), request.memory_type, self.config.review_budget())
                    .await;
                if !review.decision {
                    info!(
                        memory_type = %request.memory_type,
                        average = review.average_score,
                        quorum_met = review.quorum_met,
                        "Storage review rejected entry"
                    );
                    return Ok(None);
                }
                review.importance()
            }
        };

        let entry = self.draft(request, importance);
        let memory_type = entry.memory_type;
        let outcome = self.store.insert(entry).await.map_err(Error::storage)?;

        match &outcome {
            InsertOutcome::Created(id) => {
                info!(id = %id, memory_type = %memory_type, importance, "Stored memory entry");
            }
            InsertOutcome::Duplicate(id) => {
                debug!(id = %id, memory_type = %memory_type, "Duplicate content, returning existing entry");
            }
        }
        Ok(Some(outcome))
    }

    /// Build the row to write from a validated request.
    fn draft(&self, request: StorageRequest, importance: u8) -> NewMemoryEntry {
        let now = Utc::now();
        let expires_at = request.expires_at.or_else(|| {
            if request.memory_type.is_temporary() {
                self.config.working_ttl().map(|ttl| expires_in(now, ttl))
            } else {
                None
            }
        });
        let tags = request
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect();

        NewMemoryEntry {
            id: Uuid::new_v4().to_string(),
            content_hash: content_hash(&request.content),
            dedup_hash: dedup_hash(&request.content, self.config.dedup_scope, &request.source_agent_id),
            session_id: request.session_id,
            source_agent_id: request.source_agent_id,
            memory_type: request.memory_type,
            title: request.title.trim().to_string(),
            content: request.content,
            metadata: request.metadata,
            importance,
            tags,
            created_at: now,
            expires_at,
            parent_id: request.parent_id,
        }
    }
}
