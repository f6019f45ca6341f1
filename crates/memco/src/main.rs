//! memco - Multi-Type Memory CLI
//!
//! Stores consensus-reviewed memory entries for coding agents and serves
//! agent host hooks. Logs go to stderr so hook responses on stdout stay
//! machine-readable.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;
mod database;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("memco=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Hooks answer on stdout whatever happens, including a broken config
    if let Commands::Hook { event } = cli.command {
        return commands::hook::execute(event).await;
    }

    // Load configuration
    let config = config::Config::load()?;

    // Execute command
    match cli.command {
        Commands::Store(args) => commands::memory::store(args, &config).await,
        Commands::Query(args) => commands::memory::query(args, &config).await,
        Commands::Get { id, json } => commands::memory::get(&id, json, &config).await,
        Commands::Delete { id } => commands::memory::delete(&id, &config).await,
        Commands::ClearWorking => commands::maintenance::clear_working(&config).await,
        Commands::Sweep => commands::maintenance::sweep(&config).await,
        Commands::MigrateType { from, to } => commands::maintenance::migrate_type(&from, to, &config).await,
        Commands::Stats { json } => commands::maintenance::stats(json, &config).await,
        Commands::Audit { limit, json } => commands::maintenance::audit(limit, json, &config).await,
        Commands::Hook { event } => commands::hook::execute(event).await,
    }
}
