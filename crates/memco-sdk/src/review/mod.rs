//! Consensus Review
//!
//! Decides what is worth storing and what is worth returning by asking a
//! pool of independent scoring capabilities in parallel:
//!
//! - **capability**: the scoring contract and the tagged per-call outcome
//! - **orchestrator**: bounded fan-out, quorum and mean aggregation, audit
//! - **heuristics**: built-in local capabilities

mod capability;
mod heuristics;
mod orchestrator;

pub use capability::{CapabilityScore, Classification, ReviewOutcome, ScoringCapability, ScoringRequest};
pub use heuristics::{
    builtin_capabilities, term_overlap, terms, SignalKeywordScorer, SpecificityScorer, TypePriorScorer,
};
pub use orchestrator::{aggregate, AuditSink, ReviewOrchestrator};
