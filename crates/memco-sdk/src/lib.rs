//! memco SDK - Multi-Type Memory Coordination
//!
//! Typed memory for agents, with a consensus review in front of every write
//! and every context-aware read:
//!
//! - **review** - parallel scoring capabilities, quorum and mean aggregation
//! - **memory** - storage and retrieval pipelines behind [`MemoryCoordinator`]
//! - **hooks** - time-bounded, failure-absorbing entry points for agent hosts
//! - **config** - coordinator configuration with defaults and validation
//!
//! Persistence, entry types and the error model live in `memco-core` and are
//! re-exported here.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use memco_sdk::{CoordinatorConfig, HookAdapter, MemoryCoordinator};
//!
//! async fn example() -> memco_sdk::Result<()> {
//!     let coordinator = Arc::new(MemoryCoordinator::open(CoordinatorConfig::default())?);
//!     coordinator.start_sweeper()?;
//!
//!     let hooks = HookAdapter::new(Arc::clone(&coordinator));
//!     let context = hooks.on_prompt_received("how do we deploy?", "session-1").await;
//!     println!("{} entries for this turn", context.len());
//!     Ok(())
//! }
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Re-export core modules from memco-core
// ─────────────────────────────────────────────────────────────────────────────

/// Database access
pub use memco_core::db;

/// Core types (MemoryEntry, StorageRequest, RetrievalQuery, etc.)
pub use memco_core::types;

// ─────────────────────────────────────────────────────────────────────────────
// SDK-specific modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod config;
pub mod memory;
pub mod review;
pub mod utils;

#[cfg(feature = "hooks")]
pub mod hooks;

mod error;

// Re-export main SDK types
pub use config::{
    ConfigValidationError, CoordinatorConfig, DedupScope, HookConfig, MaintenanceConfig, QuorumPolicy,
    RetrievalConfig, ReviewConfig, StorageConfig,
};
pub use error::{CapabilityError, Error, Result, ValidationError};
pub use memco_core::{
    DroppedReview, MemoryEntry, MemoryType, Metadata, RetrievalQuery, ReviewKind, ReviewResult, ReviewScore,
    StorageRequest, MAX_IMPORTANCE, MIN_IMPORTANCE,
};
pub use memory::{MemoryCoordinator, MemoryStore, RankedEntry, RetrievalPipeline, StoragePipeline};
pub use review::{
    builtin_capabilities, CapabilityScore, Classification, ReviewOrchestrator, ReviewOutcome, ScoringCapability,
    ScoringRequest,
};

#[cfg(feature = "hooks")]
pub use hooks::{HookAdapter, HookEvent, HookResponse, KnowledgeExtractor, TranscriptSource};
