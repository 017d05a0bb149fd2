//! CLI implementation for `stagecraft clean` command
//!
//! This module handles the CLI interface for removing build output.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{self, status, OutputConfig};
use crate::config::defaults::DEFAULT_PROFILE;
use crate::core::clean::{clean_project, has_build_artifacts};
use crate::core::manifest::Manifest;

/// Execute the clean command
pub async fn execute(path: &Path, profile: Option<String>, all: bool) -> Result<()> {
    let manifest = Manifest::load_from_dir(path)
        .with_context(|| format!("Failed to load manifest in {}", path.display()))?;
    let profile = profile.unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let layout = manifest.layout(path, &profile);

    if !all && !has_build_artifacts(&layout) {
        output::print_status(status::SUCCESS, "Nothing to clean");
        return Ok(());
    }

    let result = clean_project(&layout, all).with_context(|| "Failed to clean build output")?;

    if OutputConfig::global().json {
        return output::print_json(&result);
    }
    if result.removed.is_empty() {
        output::print_status(status::SUCCESS, "Nothing to clean");
    } else {
        output::print_status(status::SUCCESS, "Cleaned build output:");
        for dir in &result.removed {
            output::print_status(status::INFO, &format!("Removed {dir}"));
        }
    }

    Ok(())
}
