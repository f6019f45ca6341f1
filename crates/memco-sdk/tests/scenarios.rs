//! End-to-end storage and retrieval scenarios against an in-memory store.

mod common;

use common::{coordinator, keyed, panel};
use memco_sdk::{MemoryType, RetrievalQuery, StorageRequest};

#[tokio::test]
async fn test_consensus_accepts_valuable_entry() {
    let coordinator = coordinator(panel(&[8, 7, 9]));

    let id = coordinator
        .store(StorageRequest::new(
            MemoryType::Semantic,
            "Timestamps",
            "All timestamps are stored as UTC milliseconds",
        ))
        .await
        .unwrap()
        .expect("entry accepted");

    let stored = coordinator.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.importance, 8);
    assert_eq!(stored.memory_type, MemoryType::Semantic);

    let reviews = coordinator.recent_reviews(1).await.unwrap();
    assert_eq!(reviews[0].average_score, 8.0);
    assert!(reviews[0].decision);
}

#[tokio::test]
async fn test_consensus_rejects_low_value_entry() {
    let coordinator = coordinator(panel(&[2, 1, 3]));

    let id = coordinator
        .store(StorageRequest::new(MemoryType::Episodic, "", "ok"))
        .await
        .unwrap();

    assert_eq!(id, None);
    assert_eq!(coordinator.stats().await.unwrap().total, 0);
    assert!(coordinator.retrieve(&RetrievalQuery::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_working_memory_leaves_other_types() {
    let coordinator = coordinator(panel(&[8, 8, 8]));
    for content in ["Editing src/db/mod.rs", "Test run pending for the parser"] {
        coordinator
            .store(StorageRequest::new(MemoryType::Working, "", content).with_importance(5))
            .await
            .unwrap()
            .unwrap();
    }
    for content in [
        "The CLI writes hook JSON to stdout",
        "Logs go to stderr",
        "SQLite runs in WAL mode",
    ] {
        coordinator
            .store(StorageRequest::new(MemoryType::Semantic, "", content).with_importance(6))
            .await
            .unwrap()
            .unwrap();
    }

    assert_eq!(coordinator.clear_working_memory().await.unwrap(), 2);

    let working = coordinator
        .retrieve(&RetrievalQuery::new().of_type(MemoryType::Working))
        .await
        .unwrap();
    assert!(working.is_empty());

    let semantic = coordinator
        .retrieve(&RetrievalQuery::new().of_type(MemoryType::Semantic))
        .await
        .unwrap();
    assert_eq!(semantic.len(), 3);

    assert_eq!(coordinator.clear_working_memory().await.unwrap(), 0);
}

#[tokio::test]
async fn test_contextual_retrieval_keeps_only_relevant_entries() {
    let coordinator = coordinator(vec![keyed("a"), keyed("b"), keyed("c")]);
    let relevance = [3, 10, 7, 1, 8, 5, 9, 2, 6, 8, 4, 7, 10, 3, 2, 9, 6, 1, 5, 4];
    for (i, score) in relevance.iter().enumerate() {
        coordinator
            .store(
                StorageRequest::new(MemoryType::Semantic, "", format!("candidate {i} rel:{score}"))
                    .with_importance(5),
            )
            .await
            .unwrap()
            .unwrap();
    }
    assert_eq!(relevance.iter().filter(|s| **s > 7).count(), 6);

    let ranked = coordinator
        .retrieve_ranked(&RetrievalQuery::new().limit(20), "which candidates matter?")
        .await
        .unwrap();

    assert_eq!(ranked.len(), 6);
    assert!(ranked.iter().all(|r| r.relevance > 7.0));
    assert!(ranked.windows(2).all(|w| w[0].relevance >= w[1].relevance));
    assert_eq!(ranked[0].relevance, 10.0);

    let entries = coordinator
        .retrieve_with_context(&RetrievalQuery::new().limit(20), "which candidates matter?")
        .await
        .unwrap();
    assert_eq!(entries.len(), 6);
}
