//! Parallel consensus review.
//!
//! Every review fans one immutable [`ScoringRequest`] out to all configured
//! capabilities on a [`JoinSet`]. Each call is bounded by the per-call
//! timeout and the whole collection wait by a caller-supplied deadline.
//! Whatever has not answered by the deadline is aborted and counted as a
//! timeout. Surviving scores are averaged, and the quorum policy decides
//! whether the average may be acted on at all.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use memco_core::db::ReviewAuditRecord;
use memco_core::{MemoryEntry, MemoryType, ReviewKind, ReviewResult, ReviewScore, MAX_IMPORTANCE, MIN_IMPORTANCE};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::capability::{Classification, ReviewOutcome, ScoringCapability, ScoringRequest};
use crate::config::{QuorumPolicy, ReviewConfig};
use crate::error::Result;
use crate::utils::{content_hash, elapsed_ms};

/// Destination for review audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, records: Vec<ReviewAuditRecord>) -> Result<()>;
}

/// Fans content out to scoring capabilities and aggregates the answers.
pub struct ReviewOrchestrator {
    capabilities: Vec<Arc<dyn ScoringCapability>>,
    config: ReviewConfig,
    audit: Option<Arc<dyn AuditSink>>,
}

impl ReviewOrchestrator {
    /// Create an orchestrator over a fixed capability pool
    pub fn new(capabilities: Vec<Arc<dyn ScoringCapability>>, config: ReviewConfig) -> Self {
        Self {
            capabilities,
            config,
            audit: None,
        }
    }

    /// Write every review to an audit sink
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Number of capabilities consulted per review
    pub fn capability_count(&self) -> usize {
        self.capabilities.len()
    }

    /// Capability identifiers, in invocation order
    pub fn capability_ids(&self) -> Vec<String> {
        self.capabilities.iter().map(|c| c.id().to_string()).collect()
    }

    /// Storage-time review: is this content worth keeping?
    pub async fn review_importance(&self, content: &str, memory_type: MemoryType, budget: Duration) -> ReviewResult {
        let deadline = Instant::now() + budget;
        let request = Arc::new(ScoringRequest {
            content: content.to_string(),
            classification: Classification::Importance { memory_type },
        });

        let (result, elapsed) = self
            .review(Arc::clone(&request), self.config.storage_threshold, deadline)
            .await;
        self.write_audit(vec![self.audit_record(&request, &result, None, elapsed)])
            .await;
        result
    }

    /// Retrieval-time review of every entry against one context, in parallel.
    ///
    /// All entries share the same deadline. The map is keyed by entry id.
    pub async fn review_relevance(
        &self,
        entries: &[MemoryEntry],
        context: &str,
        budget: Duration,
    ) -> HashMap<String, ReviewResult> {
        let deadline = Instant::now() + budget;
        let threshold = self.config.retrieval_threshold;

        let reviews = entries.iter().map(|entry| async move {
            let request = Arc::new(ScoringRequest {
                content: entry.review_text(),
                classification: Classification::Relevance {
                    memory_type: entry.memory_type,
                    context: context.to_string(),
                },
            });
            let (result, elapsed) = self.review(Arc::clone(&request), threshold, deadline).await;
            let record = self.audit_record(&request, &result, Some(&entry.id), elapsed);
            (entry.id.clone(), result, record)
        });

        let mut results = HashMap::with_capacity(entries.len());
        let mut records = Vec::with_capacity(entries.len());
        for (id, result, record) in join_all(reviews).await {
            results.insert(id, result);
            records.push(record);
        }
        self.write_audit(records).await;
        results
    }

    async fn review(&self, request: Arc<ScoringRequest>, threshold: f64, deadline: Instant) -> (ReviewResult, u64) {
        let started = std::time::Instant::now();
        let kind = request.classification.kind();
        let per_call = self.config.per_call_timeout();

        let mut tasks = JoinSet::new();
        for (index, capability) in self.capabilities.iter().enumerate() {
            let capability = Arc::clone(capability);
            let request = Arc::clone(&request);
            tasks.spawn(async move {
                let reviewer_id = capability.id().to_string();
                let outcome = AssertUnwindSafe(invoke(capability, request, per_call))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        warn!(reviewer = %reviewer_id, "Capability panicked while scoring");
                        ReviewOutcome::Failure {
                            reviewer_id,
                            message: "scoring task panicked".into(),
                        }
                    });
                (index, outcome)
            });
        }

        let mut collected: Vec<Option<ReviewOutcome>> = (0..self.capabilities.len()).map(|_| None).collect();
        let mut deadline_hit = false;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, outcome)))) => collected[index] = Some(outcome),
                Ok(Some(Err(err))) => {
                    warn!(error = %err, "Scoring task did not complete");
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        let elapsed = elapsed_ms(started);
        let outcomes = collected
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| {
                    let reviewer_id = self.capabilities[index].id().to_string();
                    if deadline_hit {
                        ReviewOutcome::Timeout {
                            reviewer_id,
                            elapsed_ms: elapsed,
                        }
                    } else {
                        ReviewOutcome::Failure {
                            reviewer_id,
                            message: "scoring task did not complete".into(),
                        }
                    }
                })
            })
            .collect();

        (aggregate(kind, threshold, self.config.quorum, outcomes), elapsed)
    }

    fn audit_record(
        &self,
        request: &ScoringRequest,
        result: &ReviewResult,
        subject_id: Option<&str>,
        elapsed_ms: u64,
    ) -> ReviewAuditRecord {
        let excerpt = (request.content.chars().count() <= self.config.audit_excerpt_chars)
            .then(|| request.content.clone());

        ReviewAuditRecord {
            id: Uuid::new_v4().to_string(),
            kind: result.kind,
            memory_type: request.classification.memory_type(),
            subject_id: subject_id.map(String::from),
            input_hash: content_hash(&request.content),
            input_excerpt: excerpt,
            scores: result.scores.clone(),
            dropped: result.dropped.clone(),
            average_score: result.average_score,
            threshold: result.threshold,
            quorum_met: result.quorum_met,
            decision: result.decision,
            elapsed_ms,
            created_at: Utc::now(),
        }
    }

    async fn write_audit(&self, records: Vec<ReviewAuditRecord>) {
        if !self.config.audit || records.is_empty() {
            return;
        }
        let Some(sink) = &self.audit else {
            return;
        };

        let count = records.len();
        if let Err(err) = sink.record(records).await {
            warn!(error = %err, records = count, "Failed to write review audit log");
        }
    }
}

/// Invoke one capability under the per-call timeout.
async fn invoke(
    capability: Arc<dyn ScoringCapability>,
    request: Arc<ScoringRequest>,
    per_call: Duration,
) -> ReviewOutcome {
    let reviewer_id = capability.id().to_string();
    let started = std::time::Instant::now();

    match tokio::time::timeout(per_call, capability.score(&request)).await {
        Ok(Ok(answer)) if (MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&answer.score) => {
            let elapsed = elapsed_ms(started);
            debug!(reviewer = %reviewer_id, score = answer.score, elapsed_ms = elapsed, "Capability scored");
            ReviewOutcome::Success(ReviewScore {
                reviewer_id,
                score: answer.score,
                rationale: answer.rationale,
                elapsed_ms: elapsed,
            })
        }
        Ok(Ok(answer)) => ReviewOutcome::Failure {
            reviewer_id,
            message: format!(
                "score {} outside {MIN_IMPORTANCE}..={MAX_IMPORTANCE}",
                answer.score
            ),
        },
        Ok(Err(err)) => ReviewOutcome::Failure {
            reviewer_id,
            message: err.to_string(),
        },
        Err(_) => ReviewOutcome::Timeout {
            reviewer_id,
            elapsed_ms: elapsed_ms(started),
        },
    }
}

/// Combine capability outcomes into one result.
///
/// The mean covers successful scores only. The decision is positive only when
/// quorum is met and the mean is strictly above the threshold.
pub fn aggregate(kind: ReviewKind, threshold: f64, quorum: QuorumPolicy, outcomes: Vec<ReviewOutcome>) -> ReviewResult {
    let reviewers = outcomes.len();
    let mut scores = Vec::with_capacity(reviewers);
    let mut dropped = Vec::new();

    for outcome in outcomes {
        match outcome {
            ReviewOutcome::Success(score) => scores.push(score),
            other => {
                warn!(kind = %kind, reviewer = %other.reviewer_id(), outcome = ?other, "Dropping capability from review");
                dropped.extend(other.into_dropped());
            }
        }
    }

    let required = quorum.required(reviewers);
    let quorum_met = reviewers > 0 && scores.len() >= required;
    let average_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|s| s.score as f64).sum::<f64>() / scores.len() as f64
    };
    let decision = quorum_met && average_score > threshold;

    if !quorum_met {
        warn!(
            kind = %kind,
            succeeded = scores.len(),
            required,
            reviewers,
            "Review quorum not met, rejecting"
        );
    }

    ReviewResult {
        kind,
        scores,
        average_score,
        decision,
        threshold,
        quorum_met,
        reviewers,
        dropped,
    }
}
