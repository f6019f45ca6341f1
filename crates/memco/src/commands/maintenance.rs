//! Maintenance commands: clear-working, sweep, migrate-type, stats, audit.

use anyhow::{Context, Result};
use colored::Colorize;
use memco_core::db::ReviewAuditRecord;
use memco_core::MemoryType;

use super::memory::type_display;
use crate::config::Config;
use crate::database::open_coordinator;

/// Remove every WORKING entry.
pub async fn clear_working(config: &Config) -> Result<()> {
    let coordinator = open_coordinator(config)?;
    let removed = coordinator
        .clear_working_memory()
        .await
        .context("Failed to clear working memory")?;
    println!("{} Cleared {} working memories", "✓".green(), removed);
    Ok(())
}

/// Remove expired entries.
pub async fn sweep(config: &Config) -> Result<()> {
    let coordinator = open_coordinator(config)?;
    let removed = coordinator
        .sweep_expired()
        .await
        .context("Failed to sweep expired entries")?;
    println!("{} Cleaned up {} expired entries", "✓".green(), removed);
    Ok(())
}

/// Rename a legacy stored type.
pub async fn migrate_type(from: &str, to: MemoryType, config: &Config) -> Result<()> {
    let coordinator = open_coordinator(config)?;
    let result = coordinator
        .migrate_legacy_type(from, to)
        .await
        .with_context(|| format!("Failed to migrate type '{from}'"))?;

    println!(
        "{} Migrated {} → {}",
        "✓".green(),
        from.dimmed(),
        type_display(to)
    );
    println!("  Renamed: {}", result.renamed);
    println!("  Merged into existing entries: {}", result.merged);
    Ok(())
}

/// Show memory statistics.
pub async fn stats(json: bool, config: &Config) -> Result<()> {
    let coordinator = open_coordinator(config)?;
    let stats = coordinator.stats().await.context("Failed to get memory stats")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{} Memory Statistics", "📊".cyan());
    println!();
    println!("  Total memories: {}", stats.total.to_string().bold());
    println!();
    println!("  By type:");
    for memory_type in MemoryType::ALL {
        let count = stats.by_type.get(memory_type.as_str()).copied().unwrap_or(0);
        println!("    {:<12} {}", type_display(memory_type), count);
    }
    let legacy: Vec<_> = stats
        .by_type
        .iter()
        .filter(|(tag, _)| !MemoryType::is_canonical_tag(tag))
        .collect();
    for (tag, count) in legacy {
        println!("    {:<12} {}  {}", tag.dimmed(), count, "(legacy)".dimmed());
    }
    println!();
    println!("  Expired, awaiting sweep: {}", stats.expired_pending);
    println!(
        "  Reviews: {} passed, {} failed",
        stats.reviews_passed.to_string().green(),
        stats.reviews_failed.to_string().red()
    );
    Ok(())
}

/// Show recent review decisions.
pub async fn audit(limit: usize, json: bool, config: &Config) -> Result<()> {
    let coordinator = open_coordinator(config)?;
    let reviews = coordinator
        .recent_reviews(limit)
        .await
        .context("Failed to list reviews")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reviews)?);
        return Ok(());
    }

    if reviews.is_empty() {
        println!("{} No reviews recorded", "⚠".yellow());
        return Ok(());
    }

    for review in &reviews {
        print_review(review);
    }
    Ok(())
}

fn print_review(review: &ReviewAuditRecord) {
    let decision = if review.decision {
        "accepted".green()
    } else {
        "rejected".red()
    };
    println!(
        "  {} {} {} [{}] avg {:.2} (threshold {:.1}) {}",
        review.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        review.kind.as_str(),
        decision,
        type_display(review.memory_type),
        review.average_score,
        review.threshold,
        format!("{}ms", review.elapsed_ms).dimmed()
    );

    if !review.quorum_met {
        println!("     {}", "quorum not met".yellow());
    }
    if let Some(ref subject) = review.subject_id {
        println!("     Entry: {}", subject);
    }
    if let Some(ref excerpt) = review.input_excerpt {
        println!("     Input: {}", excerpt.dimmed());
    }
    for score in &review.scores {
        println!("     {:<16} {:>2}  {}", score.reviewer_id, score.score, score.rationale.dimmed());
    }
    for dropped in &review.dropped {
        println!("     {:<16} {}", dropped.reviewer_id(), "dropped".red());
    }
    println!();
}
