//! Retrieval pipeline.
//!
//! The fast path is one indexed query. The smart path pulls a bounded
//! candidate set with the same filters, has every candidate re-scored for
//! relevance against the caller's context, and keeps only the ones the
//! review accepts.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use memco_core::db::MemoryQueryFilter;
use memco_core::{MemoryEntry, RetrievalQuery, ValidationError};
use tracing::debug;

use super::store::MemoryStore;
use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::review::ReviewOrchestrator;
use crate::utils::validate_query;

/// An entry returned by the smart path with its relevance average.
#[derive(Debug, Clone)]
pub struct RankedEntry {
    pub entry: MemoryEntry,
    pub relevance: f64,
}

/// Filtered, sorted and optionally relevance-reviewed reads.
pub struct RetrievalPipeline {
    store: MemoryStore,
    orchestrator: Arc<ReviewOrchestrator>,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(store: MemoryStore, orchestrator: Arc<ReviewOrchestrator>, config: RetrievalConfig) -> Self {
        Self {
            store,
            orchestrator,
            config,
        }
    }

    /// Fast path: importance descending, then most recent first.
    pub async fn query(&self, query: &RetrievalQuery) -> Result<Vec<MemoryEntry>> {
        validate_query(query)?;

        let now = Utc::now();
        let limit = self.config.effective_limit(query.limit);
        let mut entries = self
            .store
            .query(build_filter(query, limit), now)
            .await
            .map_err(Error::retrieval)?;

        self.touch(&mut entries, now).await?;
        Ok(entries)
    }

    /// Smart path: only entries the relevance review accepts, most relevant first.
    pub async fn query_with_context(&self, query: &RetrievalQuery, context: &str) -> Result<Vec<MemoryEntry>> {
        Ok(self
            .query_ranked(query, context)
            .await?
            .into_iter()
            .map(|ranked| ranked.entry)
            .collect())
    }

    /// Smart path keeping each entry's relevance average.
    ///
    /// A blank `context` falls back to the context carried on the query.
    pub async fn query_ranked(&self, query: &RetrievalQuery, context: &str) -> Result<Vec<RankedEntry>> {
        validate_query(query)?;
        let context = match query.context.as_deref() {
            Some(carried) if context.trim().is_empty() => carried,
            _ => context,
        };
        if context.trim().is_empty() {
            return Err(ValidationError::Required("context".into()).into());
        }

        let now = Utc::now();
        let limit = self.config.effective_limit(query.limit);
        let candidate_limit = self.config.candidate_limit.max(limit);
        let candidates = self
            .store
            .query(build_filter(query, candidate_limit), now)
            .await
            .map_err(Error::retrieval)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let reviews = self
            .orchestrator
            .review_relevance(&candidates, context, self.config.review_budget())
            .await;

        let candidate_count = candidates.len();
        let mut ranked: Vec<RankedEntry> = candidates
            .into_iter()
            .filter_map(|entry| {
                let review = reviews.get(&entry.id)?;
                review.decision.then(|| RankedEntry {
                    relevance: review.average_score,
                    entry,
                })
            })
            .collect();

        // Stable sort keeps the store order for full ties
        ranked.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.entry.importance.cmp(&a.entry.importance))
        });
        ranked.truncate(limit);

        debug!(
            candidates = candidate_count,
            accepted = ranked.len(),
            limit,
            "Relevance review finished"
        );

        let mut entries: Vec<MemoryEntry> = ranked.iter().map(|r| r.entry.clone()).collect();
        self.touch(&mut entries, now).await?;
        for (ranked, touched) in ranked.iter_mut().zip(entries) {
            ranked.entry = touched;
        }
        Ok(ranked)
    }

    /// Record the access on returned entries, in the store and in the values handed back.
    async fn touch(&self, entries: &mut [MemoryEntry], now: DateTime<Utc>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let ids = entries.iter().map(|e| e.id.clone()).collect();
        self.store.touch(ids, now).await.map_err(Error::retrieval)?;
        for entry in entries.iter_mut() {
            entry.accessed_at = now;
        }
        Ok(())
    }
}

/// Translate a query into a store filter.
fn build_filter(query: &RetrievalQuery, limit: usize) -> MemoryQueryFilter {
    MemoryQueryFilter {
        memory_type: query.memory_type,
        min_importance: query.min_importance,
        tags: query
            .tags
            .iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        fts_query: query.text.as_deref().and_then(fts_expression),
        session_id: query.session_id.clone(),
        source_agent_id: query.source_agent_id.clone(),
        parent_id: query.parent_id.clone(),
        created_after: query.created_after,
        created_before: query.created_before,
        limit,
    }
}

/// Turn free text into an FTS5 expression matching every word.
///
/// Each word is quoted so user input can never be parsed as FTS syntax.
pub fn fts_expression(text: &str) -> Option<String> {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| word.replace('"', ""))
        .filter(|word| !word.is_empty())
        .map(|word| format!("\"{word}\""))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
