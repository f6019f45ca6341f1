//! Coordinator construction for CLI commands.
//!
//! Every command opens the same SQLite file the hooks write to. The database
//! path is resolved by [`Config`](crate::config::Config) before we get here.

use std::sync::Arc;

use anyhow::{Context, Result};
use memco_sdk::{builtin_capabilities, MemoryCoordinator};
use tracing::debug;

use crate::config::Config;

/// Open the configured database with the built-in review panel.
pub fn open_coordinator(config: &Config) -> Result<Arc<MemoryCoordinator>> {
    let capabilities = builtin_capabilities();
    debug!(
        database = ?config.coordinator.database_path,
        capabilities = capabilities.len(),
        "Opening memory coordinator"
    );
    let coordinator = MemoryCoordinator::open_with(config.coordinator.clone(), capabilities)
        .context("Failed to open memory database")?;
    Ok(Arc::new(coordinator))
}
