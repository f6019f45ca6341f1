//! Hook Adapter
//!
//! The boundary a host agent calls into around its turns, sessions and tasks.
//! Every entry point runs under its own budget and swallows failures: a slow
//! or broken memory layer must never hold up the host, so errors and timeouts
//! are logged and turned into an empty answer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use memco_core::{MemoryEntry, RetrievalQuery, StorageRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::extraction::{
    FileTranscripts, HeuristicExtractor, KnowledgeCandidate, KnowledgeExtractor, NoTranscripts, TranscriptSource,
};
use crate::config::HookConfig;
use crate::error::{Error, Result};
use crate::memory::MemoryCoordinator;

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// An event raised by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HookEvent {
    /// A prompt arrived and the host is about to start a turn
    PromptReceived {
        prompt: String,
        #[serde(default)]
        session_id: String,
    },
    /// A session ended
    SessionEnd { session_id: String },
    /// A task finished
    TaskComplete {
        task_id: String,
        #[serde(default)]
        result_summary: String,
    },
}

impl HookEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PromptReceived { .. } => "prompt_received",
            Self::SessionEnd { .. } => "session_end",
            Self::TaskComplete { .. } => "task_complete",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The adapter's answer to a [`HookEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HookResponse {
    /// Entries to inject into the turn
    PromptReceived { entries: Vec<MemoryEntry> },
    /// Number of entries created from the session
    SessionEnd { created: usize },
    /// First entry stored from the task summary
    TaskComplete { id: Option<String> },
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Failure-absorbing, time-bounded entry points over a [`MemoryCoordinator`].
pub struct HookAdapter {
    coordinator: Arc<MemoryCoordinator>,
    extractor: Box<dyn KnowledgeExtractor>,
    transcripts: Box<dyn TranscriptSource>,
    config: HookConfig,
}

impl HookAdapter {
    /// Adapter using the coordinator's hook configuration and the heuristic extractor.
    pub fn new(coordinator: Arc<MemoryCoordinator>) -> Self {
        let config = coordinator.config().hooks.clone();
        let transcripts: Box<dyn TranscriptSource> = match config.transcripts_dir {
            Some(ref dir) => Box::new(FileTranscripts::new(dir)),
            None => Box::new(NoTranscripts),
        };
        Self {
            coordinator,
            extractor: Box::new(HeuristicExtractor::default()),
            transcripts,
            config,
        }
    }

    pub fn with_extractor(mut self, extractor: impl KnowledgeExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_transcripts(mut self, transcripts: impl TranscriptSource + 'static) -> Self {
        self.transcripts = Box::new(transcripts);
        self
    }

    pub fn coordinator(&self) -> &Arc<MemoryCoordinator> {
        &self.coordinator
    }

    /// Relevant entries for a prompt, bounded by count and total characters.
    pub async fn on_prompt_received(&self, prompt: &str, session_id: &str) -> Vec<MemoryEntry> {
        if prompt.trim().is_empty() {
            return Vec::new();
        }

        let query = RetrievalQuery::new().limit(self.config.max_entries);
        let retrieval = self.coordinator.retrieve_with_context(&query, prompt);
        let Some(entries) = bounded("prompt_received", deadline(self.config.prompt_budget()), retrieval).await else {
            return Vec::new();
        };

        let mut total = 0;
        let selected: Vec<MemoryEntry> = entries
            .into_iter()
            .filter(|entry| {
                let len = entry.char_len();
                if total + len > self.config.max_total_chars {
                    return false;
                }
                total += len;
                true
            })
            .collect();

        debug!(session_id = %session_id, entries = selected.len(), chars = total, "Injecting memory into turn");
        selected
    }

    /// Extract knowledge from a session transcript. Returns the number of new entries.
    ///
    /// Entries committed before the budget runs out are counted.
    pub async fn on_session_end(&self, session_id: &str) -> usize {
        let mut created = 0;
        let work = async {
            let Some(transcript) = self.transcripts.load(session_id).await? else {
                debug!(session_id = %session_id, "No transcript for session");
                return Ok::<_, Error>(());
            };
            for candidate in self.extractor.extract(&transcript) {
                let request = candidate_request(candidate).with_session(session_id);
                if let Some(outcome) = self.coordinator.store_outcome(request).await? {
                    if !outcome.is_duplicate() {
                        created += 1;
                    }
                }
            }
            Ok(())
        };
        bounded("session_end", deadline(self.config.session_budget()), work).await;

        info!(session_id = %session_id, created, "Session knowledge extracted");
        created
    }

    /// Extract knowledge from a task summary. Returns the first stored id.
    ///
    /// Extraction and the working memory clear share one budget; the clear
    /// is skipped once the budget is spent.
    pub async fn on_task_complete(&self, task_id: &str, result_summary: &str) -> Option<String> {
        let deadline = deadline(self.config.task_budget());
        let work = async {
            let mut first = None;
            for candidate in self.extractor.extract(result_summary) {
                let request = candidate_request(candidate).with_metadata("taskId", task_id.into());
                if let Some(id) = self.coordinator.store(request).await? {
                    first.get_or_insert(id);
                }
            }
            Ok::<_, Error>(first)
        };
        let first = bounded("task_complete", deadline, work).await.flatten();

        if self.config.clear_working_on_task_complete {
            if Instant::now() < deadline {
                bounded("task_complete", deadline, self.coordinator.clear_working_memory()).await;
            } else {
                warn!(task_id = %task_id, "No budget left, working memory not cleared");
            }
        }

        info!(task_id = %task_id, stored = first.is_some(), "Task knowledge extracted");
        first
    }

    /// Dispatch an event to its entry point.
    pub async fn on_event(&self, event: HookEvent) -> HookResponse {
        debug!(event = %event, "Handling hook event");
        match event {
            HookEvent::PromptReceived { prompt, session_id } => HookResponse::PromptReceived {
                entries: self.on_prompt_received(&prompt, &session_id).await,
            },
            HookEvent::SessionEnd { session_id } => HookResponse::SessionEnd {
                created: self.on_session_end(&session_id).await,
            },
            HookEvent::TaskComplete {
                task_id,
                result_summary,
            } => HookResponse::TaskComplete {
                id: self.on_task_complete(&task_id, &result_summary).await,
            },
        }
    }
}

fn candidate_request(candidate: KnowledgeCandidate) -> StorageRequest {
    StorageRequest::new(candidate.memory_type, candidate.title, candidate.content)
        .with_source_agent("hook")
        .with_tags(candidate.tags)
}

fn deadline(budget: Duration) -> Instant {
    Instant::now() + budget
}

/// Run `work` until `deadline`, logging and discarding any error or timeout.
async fn bounded<T>(hook: &str, deadline: Instant, work: impl Future<Output = Result<T>>) -> Option<T> {
    match tokio::time::timeout_at(deadline, work).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            warn!(hook, error = %err, "Hook failed, returning empty result");
            None
        }
        Err(_) => {
            warn!(hook, "Hook exceeded its budget");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::error::CapabilityError;
    use crate::review::{CapabilityScore, ScoringCapability, ScoringRequest};
    use async_trait::async_trait;
    use memco_core::MemoryType;

    struct Fixed(u8);

    #[async_trait]
    impl ScoringCapability for Fixed {
        fn id(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _request: &ScoringRequest) -> std::result::Result<CapabilityScore, CapabilityError> {
            Ok(CapabilityScore::new(self.0, "fixed"))
        }
    }

    struct Transcript(&'static str);

    #[async_trait]
    impl TranscriptSource for Transcript {
        async fn load(&self, _session_id: &str) -> Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    fn adapter(score: u8, config: CoordinatorConfig) -> HookAdapter {
        let coordinator = MemoryCoordinator::in_memory(vec![Arc::new(Fixed(score))], config).unwrap();
        HookAdapter::new(Arc::new(coordinator))
    }

    const TRANSCRIPT: &str = "\
We decided to always pin the toolchain version in rust-toolchain.toml.

To release, run `make release` and then push the tag.

ok";

    #[test]
    fn test_event_wire_format() {
        let event: HookEvent =
            serde_json::from_str(r#"{"event":"task_complete","taskId":"t1","resultSummary":"done"}"#).unwrap();
        assert_eq!(
            event,
            HookEvent::TaskComplete {
                task_id: "t1".into(),
                result_summary: "done".into()
            }
        );

        let response = serde_json::to_value(HookResponse::SessionEnd { created: 2 }).unwrap();
        assert_eq!(response, serde_json::json!({"event": "session_end", "created": 2}));
    }

    #[tokio::test]
    async fn test_prompt_respects_char_budget() {
        let mut config = CoordinatorConfig::default();
        config.hooks.max_total_chars = 40;
        let adapter = adapter(9, config);
        for content in ["a fact that is about thirty chars", "another fact of similar size here"] {
            adapter
                .coordinator()
                .store(StorageRequest::new(MemoryType::Semantic, "", content).with_importance(5))
                .await
                .unwrap();
        }

        let entries = adapter.on_prompt_received("tell me facts", "s1").await;
        assert_eq!(entries.len(), 1);
        assert!(adapter.on_prompt_received("   ", "s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_session_end_counts_new_entries_only() {
        let adapter = adapter(8, CoordinatorConfig::default()).with_transcripts(Transcript(TRANSCRIPT));
        assert_eq!(adapter.on_session_end("s1").await, 2);
        assert_eq!(adapter.on_session_end("s1").await, 0);
    }

    #[tokio::test]
    async fn test_session_end_without_transcript() {
        let adapter = adapter(8, CoordinatorConfig::default());
        assert_eq!(adapter.on_session_end("s1").await, 0);
    }

    #[tokio::test]
    async fn test_task_complete_stores_and_clears_working() {
        let adapter = adapter(8, CoordinatorConfig::default());
        adapter
            .coordinator()
            .store(StorageRequest::new(MemoryType::Working, "", "editing main.rs").with_importance(5))
            .await
            .unwrap();

        let id = adapter.on_task_complete("t1", TRANSCRIPT).await.unwrap();
        let stored = adapter.coordinator().get(&id).await.unwrap().unwrap();
        assert_eq!(stored.metadata.get("taskId"), Some(&serde_json::json!("t1")));

        let stats = adapter.coordinator().stats().await.unwrap();
        assert_eq!(stats.by_type.get("working").copied().unwrap_or(0), 0);
    }

    struct Slow(Duration);

    #[async_trait]
    impl ScoringCapability for Slow {
        fn id(&self) -> &str {
            "slow"
        }

        async fn score(&self, _request: &ScoringRequest) -> std::result::Result<CapabilityScore, CapabilityError> {
            tokio::time::sleep(self.0).await;
            Ok(CapabilityScore::new(8, "slow"))
        }
    }

    #[tokio::test]
    async fn test_task_complete_shares_one_budget() {
        let mut config = CoordinatorConfig::default();
        config.hooks.task_budget_ms = 100;
        config.review.per_call_timeout_ms = 1_000;
        config.storage.review_budget_ms = 1_000;
        let coordinator =
            MemoryCoordinator::in_memory(vec![Arc::new(Slow(Duration::from_millis(400)))], config).unwrap();
        let adapter = HookAdapter::new(Arc::new(coordinator));
        adapter
            .coordinator()
            .store(StorageRequest::new(MemoryType::Working, "", "editing main.rs").with_importance(5))
            .await
            .unwrap();

        let started = std::time::Instant::now();
        assert_eq!(adapter.on_task_complete("t1", TRANSCRIPT).await, None);
        assert!(started.elapsed() < Duration::from_millis(180));

        // Extraction spent the whole budget, so the clear never started
        let stats = adapter.coordinator().stats().await.unwrap();
        assert_eq!(stats.by_type.get("working").copied(), Some(1));
    }

    #[tokio::test]
    async fn test_rejected_candidates_yield_none() {
        let adapter = adapter(2, CoordinatorConfig::default());
        assert_eq!(adapter.on_task_complete("t1", TRANSCRIPT).await, None);
        assert_eq!(adapter.on_task_complete("t2", "").await, None);
    }

    #[tokio::test]
    async fn test_on_event_dispatch() {
        let adapter = adapter(8, CoordinatorConfig::default()).with_transcripts(Transcript(TRANSCRIPT));
        let response = adapter
            .on_event(HookEvent::SessionEnd {
                session_id: "s9".into(),
            })
            .await;
        assert!(matches!(response, HookResponse::SessionEnd { created: 2 }));
    }
}
