//! Memory commands: store, query, get, delete.
//!
//! Talks to the local SQLite database through the SDK coordinator, so every
//! write goes through the same review the hooks use.

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use memco_core::{MemoryEntry, MemoryType, RetrievalQuery, StorageRequest};
use memco_sdk::utils::{parse_datetime, parse_duration};

use crate::cli::{QueryArgs, StoreArgs};
use crate::config::Config;
use crate::database::open_coordinator;

/// Store a memory entry.
pub async fn store(args: StoreArgs, config: &Config) -> Result<()> {
    let request = build_request(&args)?;
    let coordinator = open_coordinator(config)?;

    let id = coordinator
        .store(request)
        .await
        .context("Failed to store memory entry")?;

    if args.json {
        println!("{}", serde_json::json!({ "id": id }));
        return Ok(());
    }

    match id {
        Some(id) => {
            println!("{} Stored {} memory", "✓".green(), type_display(args.memory_type));
            println!("  ID: {}", id);
            if !args.tags.is_empty() {
                println!("  Tags: {}", args.tags.join(", "));
            }
        }
        None => {
            println!(
                "{} Not stored: the review did not rate this worth keeping",
                "⚠".yellow()
            );
            println!("  Pass --importance to store it anyway");
        }
    }
    Ok(())
}

fn build_request(args: &StoreArgs) -> Result<StorageRequest> {
    let mut request = StorageRequest::new(args.memory_type, args.title.as_str(), args.content.as_str())
        .with_session(args.session.as_str())
        .with_source_agent(args.agent.as_str())
        .with_tags(args.tags.iter().map(String::as_str));

    if let Some(importance) = args.importance {
        request = request.with_importance(importance);
    }
    if let Some(ref ttl) = args.ttl {
        let ttl = parse_duration(ttl).ok_or_else(|| anyhow!("Invalid TTL: {ttl}. Use e.g. 90s, 15m, 2h or 7d"))?;
        request = request.with_ttl(ttl);
    }
    if let Some(ref parent) = args.parent {
        request = request.with_parent(parent.as_str());
    }
    Ok(request)
}

/// Query memory entries, optionally reviewed for relevance.
pub async fn query(args: QueryArgs, config: &Config) -> Result<()> {
    let query = build_query(&args)?;
    let coordinator = open_coordinator(config)?;

    let (entries, relevance): (Vec<MemoryEntry>, Vec<Option<f64>>) = match args.context.as_deref() {
        Some(context) => coordinator
            .retrieve_ranked(&query, context)
            .await
            .context("Failed to query memory")?
            .into_iter()
            .map(|ranked| (ranked.entry, Some(ranked.relevance)))
            .unzip(),
        None => {
            let entries = coordinator.retrieve(&query).await.context("Failed to query memory")?;
            let relevance = vec![None; entries.len()];
            (entries, relevance)
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{} No memories found matching criteria", "⚠".yellow());
        return Ok(());
    }

    println!("{} Found {} memories:", "✓".green(), entries.len());
    println!();
    for (i, (entry, relevance)) in entries.iter().zip(relevance).enumerate() {
        print_memory_entry(i + 1, entry, relevance);
    }
    Ok(())
}

fn build_query(args: &QueryArgs) -> Result<RetrievalQuery> {
    let mut query = RetrievalQuery::new()
        .min_importance(args.min_importance)
        .with_tags(args.tags.iter().map(String::as_str))
        .limit(args.limit);

    if let Some(memory_type) = args.memory_type {
        query = query.of_type(memory_type);
    }
    if let Some(ref text) = args.text {
        query = query.matching(text.as_str());
    }
    if let Some(ref session) = args.session {
        query = query.in_session(session.as_str());
    }
    if let Some(ref agent) = args.agent {
        query = query.from_agent(agent.as_str());
    }
    if let Some(ref since) = args.since {
        let after = parse_datetime(since).ok_or_else(|| invalid_time("--since", since))?;
        query = query.since(after);
    }
    if let Some(ref until) = args.until {
        let before = parse_datetime(until).ok_or_else(|| invalid_time("--until", until))?;
        query = query.until(before);
    }
    Ok(query)
}

fn invalid_time(flag: &str, value: &str) -> anyhow::Error {
    anyhow!("Invalid {flag} time: {value}. Use RFC 3339, e.g. 2024-01-15T10:30:00Z")
}

/// Show one entry.
pub async fn get(id: &str, json: bool, config: &Config) -> Result<()> {
    let coordinator = open_coordinator(config)?;
    let entry = coordinator
        .get(id)
        .await
        .context("Failed to get memory entry")?;

    let Some(entry) = entry else {
        bail!("Memory not found: {}", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        print_memory_entry(1, &entry, None);
        println!("  Created:  {}", entry.created_at.to_rfc3339());
        println!("  Accessed: {}", entry.accessed_at.to_rfc3339());
        if let Some(expires_at) = entry.expires_at {
            println!("  Expires:  {}", expires_at.to_rfc3339());
        }
    }
    Ok(())
}

/// Delete one entry.
pub async fn delete(id: &str, config: &Config) -> Result<()> {
    let coordinator = open_coordinator(config)?;
    let deleted = coordinator
        .delete(id)
        .await
        .context("Failed to delete memory entry")?;

    if deleted {
        println!("{} Deleted memory: {}", "✓".green(), id);
    } else {
        println!("{} Memory not found: {}", "⚠".yellow(), id);
    }
    Ok(())
}

/// Display name for a memory type.
pub fn type_display(memory_type: MemoryType) -> colored::ColoredString {
    let name = memory_type.as_str();
    match memory_type {
        MemoryType::Episodic => name.yellow(),
        MemoryType::Semantic => name.green(),
        MemoryType::Prospective => name.magenta(),
        MemoryType::Procedural => name.blue(),
        MemoryType::Working => name.cyan(),
    }
}

/// Print a memory entry with formatting.
fn print_memory_entry(index: usize, entry: &MemoryEntry, relevance: Option<f64>) {
    let short_id = entry.id.get(..8).unwrap_or(&entry.id);

    println!(
        "  {}. {} [{}] importance {}",
        index,
        short_id.cyan(),
        type_display(entry.memory_type),
        entry.importance.to_string().bold()
    );

    if !entry.title.is_empty() {
        println!("     Title: {}", entry.title.bold());
    }

    // Truncate content for display
    let content: String = if entry.content.chars().count() > 100 {
        format!("{}...", entry.content.chars().take(100).collect::<String>())
    } else {
        entry.content.clone()
    };
    println!("     {}", content);

    if let Some(relevance) = relevance {
        println!("     Relevance: {:.2}", relevance);
    }
    if !entry.tags.is_empty() {
        let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
        println!("     Tags: {}", tags.join(", ").dimmed());
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn store_args(argv: &[&str]) -> StoreArgs {
        let mut full = vec!["memco", "store"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Store(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_build_request() {
        let args = store_args(&["Check the migration", "-t", "working", "--ttl", "2h", "--parent", "abc"]);
        let request = build_request(&args).unwrap();
        assert_eq!(request.memory_type, MemoryType::Working);
        assert_eq!(request.parent_id.as_deref(), Some("abc"));
        assert!(request.expires_at.is_some());
        assert_eq!(request.importance, None);
    }

    #[test]
    fn test_build_request_rejects_bad_ttl() {
        let args = store_args(&["x", "--ttl", "soon"]);
        assert!(build_request(&args).is_err());
    }

    #[test]
    fn test_build_query() {
        let cli = Cli::parse_from(["memco", "query", "wal", "-t", "semantic", "-m", "6", "--tags", "db,sqlite"]);
        let Commands::Query(args) = cli.command else {
            panic!("expected query");
        };
        let query = build_query(&args).unwrap();
        assert_eq!(query.memory_type, Some(MemoryType::Semantic));
        assert_eq!(query.min_importance, 6);
        assert_eq!(query.tags, vec!["db", "sqlite"]);
        assert_eq!(query.text.as_deref(), Some("wal"));
        assert_eq!(query.created_after, None);
    }

    #[test]
    fn test_build_query_time_window() {
        let cli = Cli::parse_from([
            "memco",
            "query",
            "--since",
            "2024-01-15T10:30:00Z",
            "--until",
            "2024-02-01T00:00:00+02:00",
        ]);
        let Commands::Query(args) = cli.command else {
            panic!("expected query");
        };
        let query = build_query(&args).unwrap();
        assert_eq!(query.created_after.unwrap().to_rfc3339(), "2024-01-15T10:30:00+00:00");
        assert_eq!(query.created_before.unwrap().to_rfc3339(), "2024-01-31T22:00:00+00:00");

        let cli = Cli::parse_from(["memco", "query", "--since", "yesterday"]);
        let Commands::Query(args) = cli.command else {
            panic!("expected query");
        };
        assert!(build_query(&args).is_err());
    }
}
