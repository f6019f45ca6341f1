//! Host hook behaviour: budgets, transcripts and the JSON event interface.

#![cfg(feature = "hooks")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{coordinator_with, fixed, panel, slow};
use memco_sdk::{CoordinatorConfig, HookAdapter, HookEvent, HookResponse, MemoryType, StorageRequest};

const TRANSCRIPT: &str = "\
How to run the migrations: first, run `make db-up` and then apply the SQL files in order.

We decided that every table must carry created_at and updated_at columns.

thanks!";

fn config_with_transcripts(dir: &std::path::Path) -> CoordinatorConfig {
    let mut config = CoordinatorConfig::default();
    config.hooks.transcripts_dir = Some(dir.to_path_buf());
    config
}

#[tokio::test]
async fn test_session_end_reads_transcript_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("session-42.md"), TRANSCRIPT).unwrap();

    let coordinator = Arc::new(coordinator_with(panel(&[8, 7, 9]), config_with_transcripts(dir.path())));
    let hooks = HookAdapter::new(Arc::clone(&coordinator));

    assert_eq!(hooks.on_session_end("session-42").await, 2);

    let stats = coordinator.stats().await.unwrap();
    assert_eq!(stats.by_type.get("procedural"), Some(&1));
    assert_eq!(stats.by_type.get("semantic"), Some(&1));

    assert_eq!(hooks.on_session_end("unknown-session").await, 0);
    assert_eq!(hooks.on_session_end("../escape").await, 0);
}

#[tokio::test]
async fn test_prompt_hook_degrades_to_empty_on_timeout() {
    let mut config = CoordinatorConfig::default();
    config.hooks.prompt_budget_ms = 50;
    let coordinator = Arc::new(coordinator_with(
        vec![slow("slow", 9, Duration::from_millis(120)), fixed("fast", 9)],
        config,
    ));
    coordinator
        .store(StorageRequest::new(MemoryType::Semantic, "", "Run clippy before pushing").with_importance(7))
        .await
        .unwrap()
        .unwrap();

    let hooks = HookAdapter::new(Arc::clone(&coordinator));
    let started = std::time::Instant::now();
    let entries = hooks.on_prompt_received("what should I run before pushing?", "s1").await;

    assert!(entries.is_empty());
    assert!(started.elapsed() < Duration::from_millis(120));
}

#[tokio::test]
async fn test_prompt_hook_returns_relevant_entries() {
    let coordinator = Arc::new(coordinator_with(panel(&[9, 8, 9]), CoordinatorConfig::default()));
    for i in 0..8 {
        coordinator
            .store(StorageRequest::new(MemoryType::Semantic, "", format!("fact number {i}")).with_importance(5))
            .await
            .unwrap()
            .unwrap();
    }

    let hooks = HookAdapter::new(Arc::clone(&coordinator));
    let entries = hooks.on_prompt_received("facts please", "s1").await;
    assert_eq!(entries.len(), coordinator.config().hooks.max_entries);
}

#[tokio::test]
async fn test_json_events() {
    let coordinator = Arc::new(coordinator_with(panel(&[8, 8, 8]), CoordinatorConfig::default()));
    coordinator
        .store(StorageRequest::new(MemoryType::Working, "", "scratch notes for the task").with_importance(4))
        .await
        .unwrap()
        .unwrap();
    let hooks = HookAdapter::new(Arc::clone(&coordinator));

    let event: HookEvent = serde_json::from_value(serde_json::json!({
        "event": "task_complete",
        "taskId": "task-7",
        "resultSummary": TRANSCRIPT,
    }))
    .unwrap();
    let response = hooks.on_event(event).await;

    let HookResponse::TaskComplete { id: Some(id) } = response else {
        panic!("expected a stored id, got {response:?}");
    };
    let entry = coordinator.get(&id).await.unwrap().unwrap();
    assert_eq!(entry.metadata["taskId"], "task-7");
    assert!(entry.tags.contains("extracted"));

    let working = coordinator.stats().await.unwrap();
    assert_eq!(working.by_type.get("working"), None);

    let json = serde_json::to_value(HookResponse::TaskComplete { id: None }).unwrap();
    assert_eq!(json, serde_json::json!({"event": "task_complete", "id": null}));
}
