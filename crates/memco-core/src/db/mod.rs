//! Direct SQLite database access for memco.
//!
//! This module is the persistence store: durable writes, point lookups,
//! filtered and full-text queries, batch deletes and expiry sweeps.
//!
//! Database location priority:
//! 1. MEMCO_DATABASE_PATH env var
//! 2. ~/.memco/memco.db

pub mod types;

pub use types::*;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use crate::error::{Error, Result};
use crate::types::{MemoryEntry, MemoryType, Metadata, ReviewKind, LEGACY_TYPE_MAPPINGS};

/// Schema applied on every open; all statements are idempotent.
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

const ENTRY_COLUMNS: &str = "m.id, m.session_id, m.source_agent_id, m.memory_type, m.title, m.content,
     m.metadata_json, m.importance, m.tags_json, m.created_at, m.accessed_at, m.expires_at, m.parent_id";

/// Database connection wrapper.
///
/// Thread-safe via internal Mutex. All database operations acquire the lock,
/// so every method runs as one serialized unit of work.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open database connection, auto-detecting location
    pub fn open() -> Result<Self> {
        let path = Self::find_database()?;
        Self::open_path(&path)
    }

    /// Open database at specific path, creating it if needed
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(Error::Database)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::Database)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // WAL for concurrent readers; foreign keys for tag cascades
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        let db = Self { conn: Mutex::new(conn) };
        let migrated = db.normalize_legacy_types()?;
        if migrated.renamed > 0 || migrated.merged > 0 {
            tracing::info!(
                renamed = migrated.renamed,
                merged = migrated.merged,
                "Migrated legacy memory type tags"
            );
        }
        Ok(db)
    }

    /// Default database location (~/.memco/memco.db)
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".memco").join("memco.db"))
    }

    /// Find database file location
    fn find_database() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("MEMCO_DATABASE_PATH") {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        Self::default_path().ok_or(Error::DatabaseNotFound)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Check database connectivity
    pub fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entry Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an entry unless an unexpired entry with the same dedup key exists.
    ///
    /// Expired holders of the key are removed first; the insert itself is a
    /// single `ON CONFLICT DO NOTHING` write against the unique
    /// (memory_type, dedup_hash) index, all inside one transaction.
    pub fn insert_entry(&self, entry: &NewMemoryEntry) -> Result<InsertOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = entry.created_at.timestamp_millis();

        tx.execute(
            "DELETE FROM memory_entries
             WHERE memory_type = ?1 AND dedup_hash = ?2
               AND expires_at IS NOT NULL AND expires_at <= ?3",
            params![entry.memory_type.as_str(), &entry.dedup_hash, now],
        )?;

        let tags: Vec<&String> = entry.tags.iter().collect();
        let inserted: Option<i64> = tx
            .query_row(
                "INSERT INTO memory_entries
                 (id, session_id, source_agent_id, memory_type, title, content, metadata_json,
                  importance, tags_json, content_hash, dedup_hash, created_at, accessed_at,
                  expires_at, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12, ?13, ?14)
                 ON CONFLICT (memory_type, dedup_hash) DO NOTHING
                 RETURNING seq",
                params![
                    &entry.id,
                    &entry.session_id,
                    &entry.source_agent_id,
                    entry.memory_type.as_str(),
                    &entry.title,
                    &entry.content,
                    serde_json::to_string(&entry.metadata)?,
                    entry.importance,
                    serde_json::to_string(&tags)?,
                    &entry.content_hash,
                    &entry.dedup_hash,
                    now,
                    entry.expires_at.map(|t| t.timestamp_millis()),
                    &entry.parent_id,
                ],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match inserted {
            Some(seq) => {
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO memory_entry_tags (entry_seq, tag) VALUES (?1, ?2)",
                    )?;
                    for tag in &entry.tags {
                        stmt.execute(params![seq, tag])?;
                    }
                }
                InsertOutcome::Created(entry.id.clone())
            }
            None => {
                let existing: String = tx.query_row(
                    "SELECT id FROM memory_entries WHERE memory_type = ?1 AND dedup_hash = ?2",
                    params![entry.memory_type.as_str(), &entry.dedup_hash],
                    |row| row.get(0),
                )?;
                InsertOutcome::Duplicate(existing)
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Set `accessed_at` on the given entries. Returns the number updated.
    pub fn touch_entries(&self, ids: &[String], now: DateTime<Utc>) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare("UPDATE memory_entries SET accessed_at = ?1 WHERE id = ?2")?;
            for id in ids {
                updated += stmt.execute(params![now.timestamp_millis(), id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    /// Delete one entry. Returns whether it existed.
    pub fn delete_entry(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM memory_entries WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Delete every entry of one type, expired or not. Returns the count removed.
    pub fn delete_by_type(&self, memory_type: MemoryType) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM memory_entries WHERE memory_type = ?1",
            params![memory_type.as_str()],
        )?;
        Ok(deleted)
    }

    /// Remove entries whose expiry is at or before `now`.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM memory_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entry Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a live entry by ID. Expired entries read as absent.
    pub fn get_entry(&self, id: &str, now: DateTime<Utc>) -> Result<Option<MemoryEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM memory_entries m
             WHERE m.id = ?1 AND (m.expires_at IS NULL OR m.expires_at > ?2)"
        );
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt
            .query_row(params![id, now.timestamp_millis()], Self::map_entry)
            .optional()?)
    }

    /// Query live entries matching a filter.
    pub fn query_entries(&self, filter: &MemoryQueryFilter, now: DateTime<Utc>) -> Result<Vec<MemoryEntry>> {
        let conn = self.lock()?;

        let mut sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM memory_entries m
             WHERE (m.expires_at IS NULL OR m.expires_at > ?) AND m.importance >= ?"
        );
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![
            Box::new(now.timestamp_millis()),
            Box::new(filter.min_importance),
        ];

        if let Some(memory_type) = filter.memory_type {
            sql.push_str(" AND m.memory_type = ?");
            params_vec.push(Box::new(memory_type.as_str()));
        }

        if !filter.tags.is_empty() {
            sql.push_str(&format!(
                " AND m.seq IN (SELECT entry_seq FROM memory_entry_tags WHERE tag IN ({}))",
                filter.tags.iter().map(|_| "?").collect::<Vec<_>>().join(",")
            ));
            for tag in &filter.tags {
                params_vec.push(Box::new(tag.clone()));
            }
        }

        if let Some(ref fts_query) = filter.fts_query {
            sql.push_str(
                " AND m.seq IN (SELECT rowid FROM memory_entries_fts WHERE memory_entries_fts MATCH ?)",
            );
            params_vec.push(Box::new(fts_query.clone()));
        }

        if let Some(ref session_id) = filter.session_id {
            sql.push_str(" AND m.session_id = ?");
            params_vec.push(Box::new(session_id.clone()));
        }

        if let Some(ref source_agent_id) = filter.source_agent_id {
            sql.push_str(" AND m.source_agent_id = ?");
            params_vec.push(Box::new(source_agent_id.clone()));
        }

        if let Some(ref parent_id) = filter.parent_id {
            sql.push_str(" AND m.parent_id = ?");
            params_vec.push(Box::new(parent_id.clone()));
        }

        if let Some(after) = filter.created_after {
            sql.push_str(" AND m.created_at >= ?");
            params_vec.push(Box::new(after.timestamp_millis()));
        }

        if let Some(before) = filter.created_before {
            sql.push_str(" AND m.created_at < ?");
            params_vec.push(Box::new(before.timestamp_millis()));
        }

        sql.push_str(" ORDER BY m.importance DESC, m.created_at DESC, m.seq DESC LIMIT ?");
        params_vec.push(Box::new(filter.limit as i64));

        let param_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(param_refs.as_slice(), Self::map_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn map_entry(row: &Row) -> rusqlite::Result<MemoryEntry> {
        let type_tag: String = row.get(3)?;
        let memory_type = type_tag.parse::<MemoryType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let metadata_json: String = row.get(6)?;
        let tags_json: String = row.get(8)?;

        Ok(MemoryEntry {
            id: row.get(0)?,
            session_id: row.get(1)?,
            source_agent_id: row.get(2)?,
            memory_type,
            title: row.get(4)?,
            content: row.get(5)?,
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            importance: row.get(7)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            created_at: DateTime::from_timestamp_millis(row.get::<_, i64>(9)?).unwrap_or_default(),
            accessed_at: DateTime::from_timestamp_millis(row.get::<_, i64>(10)?).unwrap_or_default(),
            expires_at: row
                .get::<_, Option<i64>>(11)?
                .and_then(DateTime::from_timestamp_millis),
            parent_id: row.get(12)?,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Type Migration
    // ─────────────────────────────────────────────────────────────────────────

    /// Rename a stored type tag to a canonical type.
    ///
    /// Expired canonical holders of a colliding dedup key are removed first,
    /// so the legacy row takes the key over. A live legacy row that still
    /// collides is folded into the canonical row: tags and metadata keys are
    /// unioned, the higher importance and the longer lifetime are kept. Every
    /// other row keeps its id and data.
    pub fn rename_type(&self, from: &str, to: MemoryType) -> Result<TypeMigration> {
        let now = Utc::now().timestamp_millis();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM memory_entries
             WHERE memory_type = ?1 AND expires_at IS NOT NULL AND expires_at <= ?3
               AND dedup_hash IN (SELECT dedup_hash FROM memory_entries WHERE memory_type = ?2)",
            params![to.as_str(), from, now],
        )?;

        let collisions: Vec<(EntryFields, EntryFields)> = {
            let mut stmt = tx.prepare(
                "SELECT l.seq, l.title, l.metadata_json, l.importance, l.tags_json, l.expires_at,
                        c.seq, c.title, c.metadata_json, c.importance, c.tags_json, c.expires_at
                 FROM memory_entries l
                 JOIN memory_entries c ON c.dedup_hash = l.dedup_hash AND c.memory_type = ?2
                 WHERE l.memory_type = ?1",
            )?;
            let rows = stmt
                .query_map(params![from, to.as_str()], |row| {
                    Ok((EntryFields::from_row(row, 0)?, EntryFields::from_row(row, 6)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        for (legacy, canonical) in &collisions {
            if legacy.is_live(now) {
                let merged = canonical.merge(legacy);
                tx.execute(
                    "UPDATE memory_entries
                     SET title = ?2, metadata_json = ?3, importance = ?4, tags_json = ?5, expires_at = ?6
                     WHERE seq = ?1",
                    params![
                        canonical.seq,
                        &merged.title,
                        serde_json::to_string(&merged.metadata)?,
                        merged.importance,
                        serde_json::to_string(&merged.tags)?,
                        merged.expires_at,
                    ],
                )?;
                let mut stmt = tx.prepare_cached(
                    "INSERT OR IGNORE INTO memory_entry_tags (entry_seq, tag) VALUES (?1, ?2)",
                )?;
                for tag in &merged.tags {
                    stmt.execute(params![canonical.seq, tag])?;
                }
            }
            tx.execute("DELETE FROM memory_entries WHERE seq = ?1", params![legacy.seq])?;
        }

        let renamed = tx.execute(
            "UPDATE memory_entries SET memory_type = ?2 WHERE memory_type = ?1",
            params![from, to.as_str()],
        )?;

        tx.commit()?;
        Ok(TypeMigration {
            renamed,
            merged: collisions.len(),
        })
    }

    /// Apply every built-in legacy mapping.
    pub fn normalize_legacy_types(&self) -> Result<TypeMigration> {
        let legacy_tags: Vec<String> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare("SELECT DISTINCT memory_type FROM memory_entries")?;
            let tags = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            tags.into_iter()
                .filter(|tag| !MemoryType::is_canonical_tag(tag))
                .collect()
        };

        let mut total = TypeMigration::default();
        for tag in legacy_tags {
            let Some(target) = MemoryType::from_legacy(&tag) else {
                tracing::warn!(tag = %tag, "Stored memory type has no canonical mapping");
                continue;
            };
            let result = self.rename_type(&tag, target)?;
            total.renamed += result.renamed;
            total.merged += result.merged;
        }
        Ok(total)
    }

    /// Known legacy tags, for diagnostics.
    pub fn legacy_mappings() -> &'static [(&'static str, MemoryType)] {
        LEGACY_TYPE_MAPPINGS
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Review Audit Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append reviews to the audit log in one transaction
    pub fn insert_reviews(&self, records: &[ReviewAuditRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO review_audit
                 (id, kind, memory_type, subject_id, input_hash, input_excerpt, scores_json,
                  dropped_json, average_score, threshold, quorum_met, decision, elapsed_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for record in records {
                stmt.execute(params![
                    &record.id,
                    record.kind.as_str(),
                    record.memory_type.as_str(),
                    &record.subject_id,
                    &record.input_hash,
                    &record.input_excerpt,
                    serde_json::to_string(&record.scores)?,
                    serde_json::to_string(&record.dropped)?,
                    record.average_score,
                    record.threshold,
                    record.quorum_met,
                    record.decision,
                    record.elapsed_ms as i64,
                    record.created_at.timestamp_millis(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Most recent reviews first
    pub fn list_reviews(&self, limit: usize) -> Result<Vec<ReviewAuditRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, memory_type, subject_id, input_hash, input_excerpt, scores_json,
                    dropped_json, average_score, threshold, quorum_met, decision, elapsed_ms, created_at
             FROM review_audit
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit as i64], Self::map_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn map_review(row: &Row) -> rusqlite::Result<ReviewAuditRecord> {
        let kind = match row.get::<_, String>(1)?.as_str() {
            "relevance" => ReviewKind::Relevance,
            _ => ReviewKind::Importance,
        };
        let memory_type = row
            .get::<_, String>(2)?
            .parse::<MemoryType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e)))?;
        let scores_json: String = row.get(6)?;
        let dropped_json: String = row.get(7)?;

        Ok(ReviewAuditRecord {
            id: row.get(0)?,
            kind,
            memory_type,
            subject_id: row.get(3)?,
            input_hash: row.get(4)?,
            input_excerpt: row.get(5)?,
            scores: serde_json::from_str(&scores_json).unwrap_or_default(),
            dropped: serde_json::from_str(&dropped_json).unwrap_or_default(),
            average_score: row.get(8)?,
            threshold: row.get(9)?,
            quorum_met: row.get(10)?,
            decision: row.get(11)?,
            elapsed_ms: row.get::<_, i64>(12)?.max(0) as u64,
            created_at: DateTime::from_timestamp_millis(row.get::<_, i64>(13)?).unwrap_or_default(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics
    // ─────────────────────────────────────────────────────────────────────────

    /// Get memory statistics
    pub fn stats(&self, now: DateTime<Utc>) -> Result<MemoryStats> {
        let conn = self.lock()?;
        let now_ms = now.timestamp_millis();
        let mut stats = MemoryStats::default();

        let mut stmt = conn.prepare(
            "SELECT memory_type, COUNT(*) FROM memory_entries
             WHERE expires_at IS NULL OR expires_at > ?1
             GROUP BY memory_type",
        )?;
        let rows = stmt.query_map(params![now_ms], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (memory_type, count) = row?;
            stats.total += count as usize;
            stats.by_type.insert(memory_type, count as usize);
        }

        let expired: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memory_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now_ms],
            |row| row.get(0),
        )?;
        stats.expired_pending = expired as usize;

        let (passed, failed): (i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(decision), 0), COALESCE(SUM(1 - decision), 0) FROM review_audit",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        stats.reviews_passed = passed as usize;
        stats.reviews_failed = failed as usize;

        Ok(stats)
    }
}

/// Mergeable columns of one stored row, used when folding legacy rows.
struct EntryFields {
    seq: i64,
    title: String,
    metadata: Metadata,
    importance: u8,
    tags: BTreeSet<String>,
    expires_at: Option<i64>,
}

impl EntryFields {
    fn from_row(row: &Row, offset: usize) -> rusqlite::Result<Self> {
        let metadata_json: String = row.get(offset + 2)?;
        let tags_json: String = row.get(offset + 4)?;
        Ok(Self {
            seq: row.get(offset)?,
            title: row.get(offset + 1)?,
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            importance: row.get(offset + 3)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            expires_at: row.get(offset + 5)?,
        })
    }

    fn is_live(&self, now: i64) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }

    /// Fold `other` into a copy of `self`. Values already on `self` win.
    fn merge(&self, other: &EntryFields) -> EntryFields {
        let mut metadata = self.metadata.clone();
        for (key, value) in &other.metadata {
            metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
        EntryFields {
            seq: self.seq,
            title: if self.title.is_empty() { other.title.clone() } else { self.title.clone() },
            metadata,
            importance: self.importance.max(other.importance),
            tags: self.tags.union(&other.tags).cloned().collect(),
            expires_at: match (self.expires_at, other.expires_at) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_entry(memory_type: MemoryType, content: &str, importance: u8) -> NewMemoryEntry {
        NewMemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: "session-1".into(),
            source_agent_id: "agent-1".into(),
            memory_type,
            title: String::new(),
            content: content.into(),
            metadata: Metadata::new(),
            importance,
            tags: BTreeSet::new(),
            content_hash: format!("content:{content}"),
            dedup_hash: format!("dedup:{content}"),
            created_at: Utc::now(),
            expires_at: None,
            parent_id: None,
        }
    }

    fn filter(limit: usize) -> MemoryQueryFilter {
        MemoryQueryFilter {
            limit,
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let mut entry = new_entry(MemoryType::Semantic, "cargo fmt before commit", 7);
        entry.tags.insert("rust".into());

        let outcome = db.insert_entry(&entry).unwrap();
        assert_eq!(outcome, InsertOutcome::Created(entry.id.clone()));

        let stored = db.get_entry(&entry.id, Utc::now()).unwrap().unwrap();
        assert_eq!(stored.content, "cargo fmt before commit");
        assert_eq!(stored.importance, 7);
        assert!(stored.tags.contains("rust"));
        assert_eq!(stored.memory_type, MemoryType::Semantic);
    }

    #[test]
    fn test_duplicate_returns_existing_id() {
        let db = Database::open_in_memory().unwrap();
        let first = new_entry(MemoryType::Semantic, "same content", 5);
        let second = new_entry(MemoryType::Semantic, "same content", 9);

        db.insert_entry(&first).unwrap();
        let outcome = db.insert_entry(&second).unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate(first.id.clone()));
        assert_eq!(db.query_entries(&filter(10), Utc::now()).unwrap().len(), 1);

        // Same content under another type is a separate entry
        let other_type = new_entry(MemoryType::Episodic, "same content", 5);
        assert!(!db.insert_entry(&other_type).unwrap().is_duplicate());
    }

    #[test]
    fn test_expired_duplicate_is_replaced() {
        let db = Database::open_in_memory().unwrap();
        let mut stale = new_entry(MemoryType::Working, "scratch note", 3);
        stale.created_at = Utc::now() - Duration::hours(2);
        stale.expires_at = Some(Utc::now() - Duration::hours(1));
        db.insert_entry(&stale).unwrap();

        let fresh = new_entry(MemoryType::Working, "scratch note", 3);
        let outcome = db.insert_entry(&fresh).unwrap();
        assert_eq!(outcome, InsertOutcome::Created(fresh.id.clone()));
        assert!(db.get_entry(&stale.id, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_query_ordering_and_min_importance() {
        let db = Database::open_in_memory().unwrap();
        let base = Utc::now() - Duration::minutes(10);
        for (i, importance) in [3u8, 8, 8, 5].into_iter().enumerate() {
            let mut entry = new_entry(MemoryType::Semantic, &format!("entry {i}"), importance);
            entry.created_at = base + Duration::seconds(i as i64);
            db.insert_entry(&entry).unwrap();
        }

        let results = db
            .query_entries(
                &MemoryQueryFilter {
                    min_importance: 5,
                    limit: 10,
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        let contents: Vec<&str> = results.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["entry 2", "entry 1", "entry 3"]);
    }

    #[test]
    fn test_query_excludes_expired() {
        let db = Database::open_in_memory().unwrap();
        let mut expired = new_entry(MemoryType::Episodic, "old", 9);
        expired.expires_at = Some(Utc::now() - Duration::seconds(1));
        db.insert_entry(&expired).unwrap();
        db.insert_entry(&new_entry(MemoryType::Episodic, "live", 2)).unwrap();

        let results = db.query_entries(&filter(10), Utc::now()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "live");
        assert!(db.get_entry(&expired.id, Utc::now()).unwrap().is_none());

        assert_eq!(db.sweep_expired(Utc::now()).unwrap(), 1);
        assert_eq!(db.stats(Utc::now()).unwrap().expired_pending, 0);
    }

    #[test]
    fn test_tag_and_fulltext_filters() {
        let db = Database::open_in_memory().unwrap();
        let mut tagged = new_entry(MemoryType::Procedural, "Run migrations with sqlx", 6);
        tagged.tags.insert("db".into());
        db.insert_entry(&tagged).unwrap();

        let mut other = new_entry(MemoryType::Procedural, "Deploy with the release script", 6);
        other.title = "Deploying".into();
        other.tags.insert("ops".into());
        db.insert_entry(&other).unwrap();

        let by_tag = db
            .query_entries(
                &MemoryQueryFilter {
                    tags: vec!["db".into(), "missing".into()],
                    limit: 10,
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, tagged.id);

        let by_text = db
            .query_entries(
                &MemoryQueryFilter {
                    fts_query: Some("\"deploying\"".into()),
                    limit: 10,
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].id, other.id);
    }

    #[test]
    fn test_delete_by_type_and_tags_cascade() {
        let db = Database::open_in_memory().unwrap();
        let mut working = new_entry(MemoryType::Working, "current file", 4);
        working.tags.insert("task".into());
        db.insert_entry(&working).unwrap();
        db.insert_entry(&new_entry(MemoryType::Semantic, "keep me", 4)).unwrap();

        assert_eq!(db.delete_by_type(MemoryType::Working).unwrap(), 1);
        let remaining = db.query_entries(&filter(10), Utc::now()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].memory_type, MemoryType::Semantic);

        let conn = db.lock().unwrap();
        let tag_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_entry_tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(tag_rows, 0);
    }

    #[test]
    fn test_touch_updates_accessed_at() {
        let db = Database::open_in_memory().unwrap();
        let mut entry = new_entry(MemoryType::Semantic, "touch me", 5);
        entry.created_at = Utc::now() - Duration::hours(1);
        db.insert_entry(&entry).unwrap();

        let later = Utc::now();
        assert_eq!(db.touch_entries(&[entry.id.clone()], later).unwrap(), 1);
        let stored = db.get_entry(&entry.id, Utc::now()).unwrap().unwrap();
        assert_eq!(stored.accessed_at.timestamp_millis(), later.timestamp_millis());
        assert!(stored.accessed_at > stored.created_at);
    }

    #[test]
    fn test_rename_legacy_type() {
        let db = Database::open_in_memory().unwrap();
        db.insert_entry(&new_entry(MemoryType::Semantic, "shared", 5)).unwrap();
        {
            let conn = db.lock().unwrap();
            for (id, content) in [("legacy-1", "shared"), ("legacy-2", "unique")] {
                conn.execute(
                    "INSERT INTO memory_entries (id, memory_type, content, importance, content_hash, dedup_hash, created_at, accessed_at)
                     VALUES (?1, 'long_term', ?2, 5, ?2, ?3, 0, 0)",
                    params![id, content, format!("dedup:{content}")],
                )
                .unwrap();
            }
        }

        let result = db.normalize_legacy_types().unwrap();
        assert_eq!(result, TypeMigration { renamed: 1, merged: 1 });

        let unique = db.get_entry("legacy-2", Utc::now()).unwrap().unwrap();
        assert_eq!(unique.memory_type, MemoryType::Semantic);
        assert_eq!(db.query_entries(&filter(10), Utc::now()).unwrap().len(), 2);
    }

    fn insert_legacy(db: &Database, id: &str, content: &str, importance: u8, tags_json: &str) {
        let conn = db.lock().unwrap();
        conn.execute(
            "INSERT INTO memory_entries (id, memory_type, content, importance, tags_json, metadata_json,
                                         content_hash, dedup_hash, created_at, accessed_at)
             VALUES (?1, 'long_term', ?2, ?3, ?4, '{\"origin\":\"legacy\"}', ?2, ?5, 0, 0)",
            params![id, content, importance, tags_json, format!("dedup:{content}")],
        )
        .unwrap();
    }

    #[test]
    fn test_rename_replaces_expired_canonical_holder() {
        let db = Database::open_in_memory().unwrap();
        let mut stale = new_entry(MemoryType::Semantic, "shared fact", 5);
        stale.created_at = Utc::now() - Duration::hours(2);
        stale.expires_at = Some(Utc::now() - Duration::hours(1));
        db.insert_entry(&stale).unwrap();
        insert_legacy(&db, "legacy-live", "shared fact", 6, r#"["keep-me"]"#);

        let result = db.rename_type("long_term", MemoryType::Semantic).unwrap();
        assert_eq!(result, TypeMigration { renamed: 1, merged: 0 });

        db.sweep_expired(Utc::now()).unwrap();
        let survivor = db.get_entry("legacy-live", Utc::now()).unwrap().unwrap();
        assert_eq!(survivor.memory_type, MemoryType::Semantic);
        assert!(survivor.tags.contains("keep-me"));
        assert_eq!(db.query_entries(&filter(10), Utc::now()).unwrap().len(), 1);
    }

    #[test]
    fn test_rename_merges_into_live_canonical() {
        let db = Database::open_in_memory().unwrap();
        let mut canonical = new_entry(MemoryType::Semantic, "shared fact", 4);
        canonical.tags.insert("existing".into());
        canonical.expires_at = Some(Utc::now() + Duration::hours(1));
        db.insert_entry(&canonical).unwrap();
        insert_legacy(&db, "legacy-live", "shared fact", 8, r#"["keep-me"]"#);

        let result = db.rename_type("long_term", MemoryType::Semantic).unwrap();
        assert_eq!(result, TypeMigration { renamed: 0, merged: 1 });
        assert!(db.get_entry("legacy-live", Utc::now()).unwrap().is_none());

        let merged = db.get_entry(&canonical.id, Utc::now()).unwrap().unwrap();
        assert_eq!(merged.importance, 8);
        assert!(merged.tags.contains("existing"));
        assert!(merged.tags.contains("keep-me"));
        assert_eq!(merged.metadata.get("origin"), Some(&serde_json::json!("legacy")));
        // The legacy row never expired, so neither does the merged entry
        assert_eq!(merged.expires_at, None);

        let by_tag = db
            .query_entries(
                &MemoryQueryFilter {
                    tags: vec!["keep-me".into()],
                    limit: 10,
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, canonical.id);
    }

    #[test]
    fn test_review_audit_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let record = ReviewAuditRecord {
            id: "review-1".into(),
            kind: ReviewKind::Importance,
            memory_type: MemoryType::Semantic,
            subject_id: None,
            input_hash: "abc".into(),
            input_excerpt: Some("short".into()),
            scores: vec![],
            dropped: vec![],
            average_score: 0.0,
            threshold: 4.0,
            quorum_met: false,
            decision: false,
            elapsed_ms: 12,
            created_at: Utc::now(),
        };
        db.insert_reviews(&[record]).unwrap();

        let reviews = db.list_reviews(5).unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].id, "review-1");
        assert!(!reviews[0].decision);

        let stats = db.stats(Utc::now()).unwrap();
        assert_eq!(stats.reviews_failed, 1);
        assert_eq!(stats.reviews_passed, 0);
    }

    #[test]
    fn test_open_path_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memco.db");
        let entry = new_entry(MemoryType::Prospective, "remind me", 6);
        {
            let db = Database::open_path(&path).unwrap();
            db.insert_entry(&entry).unwrap();
        }
        let db = Database::open_path(&path).unwrap();
        assert!(db.get_entry(&entry.id, Utc::now()).unwrap().is_some());
    }
}
