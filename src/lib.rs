//! Stagecraft - multi-unit build orchestration
//!
//! This library stages the source trees of interdependent units into
//! per-profile workspaces, builds them in dependency order with hooks around
//! every stage, verifies declared artifacts and assembles the code path other
//! tooling searches for build output.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Orchestration logic
//! - [`infra`] - Infrastructure layer (filesystem, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
