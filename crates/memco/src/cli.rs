//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use memco_core::MemoryType;

/// memco - typed memory for coding agents
///
/// Stores reviewed memory entries, answers filtered and context-aware
/// queries, and serves agent host hooks over stdin/stdout.
#[derive(Parser, Debug)]
#[command(name = "memco")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a memory entry (reviewed unless --importance is given)
    Store(StoreArgs),

    /// Query memory entries (add --context for relevance review)
    Query(QueryArgs),

    /// Show a single entry
    Get {
        /// Entry ID
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete a single entry
    Delete {
        /// Entry ID
        id: String,
    },

    /// Remove every WORKING entry
    ClearWorking,

    /// Remove expired entries now
    Sweep,

    /// Rename a legacy stored type to a canonical type
    MigrateType {
        /// Stored type tag to rename (e.g. long_term)
        from: String,

        /// Canonical target type
        to: MemoryType,
    },

    /// Show memory statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show recent review decisions
    Audit {
        /// Number of reviews to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Handle a host hook event (JSON payload on stdin, JSON response on stdout)
    Hook {
        /// Event to handle
        #[arg(value_enum)]
        event: HookEventKind,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Content to store
    pub content: String,

    /// Memory type: episodic, semantic, prospective, procedural, working
    #[arg(short = 't', long = "type", default_value = "episodic")]
    pub memory_type: MemoryType,

    /// Short title
    #[arg(long, default_value = "")]
    pub title: String,

    /// Explicit importance (1-10), skips the review
    #[arg(short, long)]
    pub importance: Option<u8>,

    /// Tags (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Session the entry belongs to
    #[arg(short, long, env = "MEMCO_SESSION_ID", default_value = "")]
    pub session: String,

    /// Agent storing the entry
    #[arg(short, long, env = "MEMCO_AGENT_ID", default_value = "")]
    pub agent: String,

    /// Time to live (e.g. 90s, 15m, 2h, 7d)
    #[arg(long)]
    pub ttl: Option<String>,

    /// Parent entry ID
    #[arg(long)]
    pub parent: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Full-text search terms
    pub text: Option<String>,

    /// Filter by memory type
    #[arg(short = 't', long = "type")]
    pub memory_type: Option<MemoryType>,

    /// Minimum importance (1-10)
    #[arg(short, long, default_value = "1")]
    pub min_importance: u8,

    /// Tags, any of which must match (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Maximum results (0 = configured default)
    #[arg(short, long, default_value = "0")]
    pub limit: usize,

    /// Context to review relevance against
    #[arg(short, long)]
    pub context: Option<String>,

    /// Filter by session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Filter by source agent
    #[arg(short, long)]
    pub agent: Option<String>,

    /// Only entries created at or after this RFC 3339 time
    #[arg(long)]
    pub since: Option<String>,

    /// Only entries created before this RFC 3339 time
    #[arg(long)]
    pub until: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Hook Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookEventKind {
    /// Before a turn: {"prompt", "sessionId"}
    PromptReceived,
    /// After a session: {"sessionId"}
    SessionEnd,
    /// After a task: {"taskId", "resultSummary"}
    TaskComplete,
}

impl HookEventKind {
    /// Tag used in the JSON event and response
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PromptReceived => "prompt_received",
            Self::SessionEnd => "session_end",
            Self::TaskComplete => "task_complete",
        }
    }
}
