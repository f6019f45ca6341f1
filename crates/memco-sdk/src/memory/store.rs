//! Memory Store Implementation
//!
//! Async facade over the SQLite [`Database`]. Every call runs on the blocking
//! thread pool so pipeline tasks never stall the runtime on disk I/O.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memco_core::db::{InsertOutcome, MemoryQueryFilter, MemoryStats, NewMemoryEntry, ReviewAuditRecord, TypeMigration};
use memco_core::{Database, MemoryEntry, MemoryType};

use crate::error::{Error, Result};
use crate::review::AuditSink;

/// Memory store for persisting memory entries to SQLite
#[derive(Clone)]
pub struct MemoryStore {
    db: Arc<Database>,
}

impl MemoryStore {
    /// Create a new memory store
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store backed by a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(Database::open_in_memory()?)))
    }

    /// The underlying database handle
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }

    /// Insert unless an unexpired duplicate exists
    pub async fn insert(&self, entry: NewMemoryEntry) -> Result<InsertOutcome> {
        self.run(move |db| db.insert_entry(&entry)).await
    }

    /// Get a live entry by ID
    pub async fn get(&self, id: &str) -> Result<Option<MemoryEntry>> {
        let id = id.to_string();
        self.run(move |db| db.get_entry(&id, Utc::now())).await
    }

    /// Query live entries
    pub async fn query(&self, filter: MemoryQueryFilter, now: DateTime<Utc>) -> Result<Vec<MemoryEntry>> {
        self.run(move |db| db.query_entries(&filter, now)).await
    }

    /// Record an access on entries returned to a caller
    pub async fn touch(&self, ids: Vec<String>, now: DateTime<Utc>) -> Result<usize> {
        self.run(move |db| db.touch_entries(&ids, now)).await
    }

    /// Delete one entry
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.run(move |db| db.delete_entry(&id)).await
    }

    /// Delete every entry of a type
    pub async fn delete_by_type(&self, memory_type: MemoryType) -> Result<usize> {
        self.run(move |db| db.delete_by_type(memory_type)).await
    }

    /// Remove expired entries
    pub async fn sweep_expired(&self) -> Result<usize> {
        self.run(|db| db.sweep_expired(Utc::now())).await
    }

    /// Rename a stored type tag
    pub async fn rename_type(&self, from: &str, to: MemoryType) -> Result<TypeMigration> {
        let from = from.to_string();
        self.run(move |db| db.rename_type(&from, to)).await
    }

    /// Memory statistics
    pub async fn stats(&self) -> Result<MemoryStats> {
        self.run(|db| db.stats(Utc::now())).await
    }

    /// Most recent reviews first
    pub async fn recent_reviews(&self, limit: usize) -> Result<Vec<ReviewAuditRecord>> {
        self.run(move |db| db.list_reviews(limit)).await
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, records: Vec<ReviewAuditRecord>) -> Result<()> {
        self.run(move |db| db.insert_reviews(&records)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn entry(memory_type: MemoryType, content: &str) -> NewMemoryEntry {
        NewMemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: String::new(),
            source_agent_id: String::new(),
            memory_type,
            title: String::new(),
            content: content.into(),
            metadata: Default::default(),
            importance: 5,
            tags: BTreeSet::new(),
            content_hash: crate::utils::content_hash(content),
            dedup_hash: crate::utils::content_hash(content),
            created_at: Utc::now(),
            expires_at: None,
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let store = MemoryStore::in_memory().unwrap();
        let new = entry(MemoryType::Semantic, "The API uses snake_case");
        let outcome = store.insert(new.clone()).await.unwrap();
        assert!(!outcome.is_duplicate());

        let fetched = store.get(outcome.id()).await.unwrap().unwrap();
        assert_eq!(fetched.content, "The API uses snake_case");

        assert!(store.delete(outcome.id()).await.unwrap());
        assert!(store.get(outcome.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_identical_inserts_yield_one_entry() {
        let store = MemoryStore::in_memory().unwrap();
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = store.clone();
            tasks.spawn(async move { store.insert(entry(MemoryType::Semantic, "same fact")).await });
        }

        let mut ids = BTreeSet::new();
        while let Some(result) = tasks.join_next().await {
            ids.insert(result.unwrap().unwrap().into_id());
        }
        assert_eq!(ids.len(), 1);
        assert_eq!(store.stats().await.unwrap().total, 1);
    }
}
