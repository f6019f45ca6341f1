//! Hashing Utilities

use sha2::{Digest, Sha256};

use crate::config::DedupScope;

/// Compute SHA-256 hash of content and return as hex string
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Collapse whitespace and case so trivially different copies hash alike.
pub fn normalize_content(content: &str) -> String {
    content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Key used by the unique (type, dedup_hash) index.
///
/// The memory type is a separate column of that index, so it is not hashed here.
pub fn dedup_hash(content: &str, scope: DedupScope, source_agent_id: &str) -> String {
    let mut hasher = Sha256::new();
    if scope == DedupScope::TypeAndSource {
        hasher.update(source_agent_id.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(normalize_content(content).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let hash = content_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(content_hash("hello world"), content_hash("hello world"));
        assert_ne!(content_hash("hello world"), content_hash("hello world!"));
        assert_eq!(
            content_hash("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_dedup_hash_normalizes() {
        assert_eq!(
            dedup_hash("Use  WAL mode\n", DedupScope::Type, "a"),
            dedup_hash("use wal mode", DedupScope::Type, "b")
        );
    }

    #[test]
    fn test_dedup_hash_source_scope() {
        assert_ne!(
            dedup_hash("same", DedupScope::TypeAndSource, "agent-a"),
            dedup_hash("same", DedupScope::TypeAndSource, "agent-b")
        );
        assert_eq!(
            dedup_hash("same", DedupScope::TypeAndSource, "agent-a"),
            dedup_hash("same", DedupScope::TypeAndSource, "agent-a")
        );
    }
}
