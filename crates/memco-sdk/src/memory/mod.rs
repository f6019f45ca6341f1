//! Multi-Type Memory
//!
//! Entries are typed EPISODIC, SEMANTIC, PROSPECTIVE, PROCEDURAL or WORKING.
//! Writes pass a consensus importance review before they are committed;
//! reads either take the fast indexed path or have a candidate set re-scored
//! for relevance to the caller's context.
//!
//! # Architecture
//!
//! 1. [`MemoryStore`] runs SQLite work off the async runtime
//! 2. [`StoragePipeline`] reviews and deduplicates writes
//! 3. [`RetrievalPipeline`] serves fast and context-aware reads
//! 4. [`MemoryCoordinator`] composes them and owns maintenance

mod coordinator;
mod retrieval;
mod storage;
mod store;

pub use coordinator::MemoryCoordinator;
pub use retrieval::{fts_expression, RankedEntry, RetrievalPipeline};
pub use storage::StoragePipeline;
pub use store::MemoryStore;
