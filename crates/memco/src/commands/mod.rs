//! Command implementations for the memco CLI.
//!
//! Each submodule implements the logic for a command group.

pub mod hook;
pub mod maintenance;
pub mod memory;
