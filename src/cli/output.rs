//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress, status lines and
//! errors, honouring the global quiet, JSON and verbosity flags.

use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::Level;

static GLOBAL: OnceLock<OutputConfig> = OnceLock::new();

/// Output settings selected on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Suppress everything except errors
    pub quiet: bool,
    /// Machine-readable output
    pub json: bool,
    /// Verbosity level (count of `-v`)
    pub verbose: u8,
}

impl OutputConfig {
    /// Create an output configuration
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make this configuration the process-wide one
    ///
    /// Only the first call has an effect.
    pub fn apply_global(self) {
        let _ = GLOBAL.set(self);
    }

    /// Process-wide configuration (defaults when none was applied)
    pub fn global() -> Self {
        GLOBAL.get().copied().unwrap_or_default()
    }

    /// Maximum log level for the tracing subscriber
    pub fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    /// Whether human-readable progress and status lines are shown
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Create a spinner for operations with unknown duration
///
/// Hidden when progress output is disabled.
pub fn create_spinner(message: &str) -> ProgressBar {
    if !OutputConfig::global().show_progress() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Print a status line unless output is quiet or JSON
pub fn print_status(prefix: &str, message: &str) {
    if OutputConfig::global().show_progress() {
        println!("{prefix} {message}");
    }
}

/// Print `value` as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Display the terminal error of a run on stderr
pub fn display_error(error: &anyhow::Error) {
    if OutputConfig::global().json {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({ "error": error.to_string(), "causes": causes });
        eprintln!("{body}");
        return;
    }
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}
