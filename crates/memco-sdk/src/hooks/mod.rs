//! Host Hooks
//!
//! Event-driven entry points for an agent host:
//!
//! - **adapter**: pre-turn retrieval, end-of-session and end-of-task extraction
//! - **extraction**: keyword classifier and transcript sources

mod adapter;
mod extraction;

pub use adapter::{HookAdapter, HookEvent, HookResponse};
pub use extraction::{
    ExtractionConfig, FileTranscripts, HeuristicExtractor, KnowledgeCandidate, KnowledgeExtractor, NoTranscripts,
    TranscriptSource,
};
