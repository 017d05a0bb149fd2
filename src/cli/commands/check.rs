//! Check command implementation
//!
//! Implements `stagecraft check` to validate configuration without building.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::cli::output::{self, status, OutputConfig};
use crate::config::defaults::DEFAULT_PROFILE;
use crate::core::check;
use crate::core::manifest::Manifest;

/// Execute the check command
pub async fn execute(project_dir: &Path, profile: Option<String>) -> Result<()> {
    let manifest = Manifest::load_from_dir(project_dir)
        .with_context(|| format!("Failed to load manifest in {}", project_dir.display()))?;
    let profile = profile.unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    tracing::info!("Checking project: {}", manifest.project.name);
    let result = check::check(project_dir, &manifest, &profile);

    if OutputConfig::global().json {
        output::print_json(&result)?;
    } else {
        if result.config_valid {
            output::print_status(status::SUCCESS, "Configuration is valid");
        } else {
            output::print_status(status::ERROR, "Configuration has errors");
        }

        if result.dependencies_valid {
            output::print_status(status::SUCCESS, "Build order resolved");
            if !result.dependency_order.is_empty() {
                output::print_status(
                    status::INFO,
                    &format!("Dependencies: {}", result.dependency_order.join(", ")),
                );
            }
            output::print_status(
                status::INFO,
                &format!("Build order: {}", result.build_order.join(", ")),
            );
        } else {
            output::print_status(status::ERROR, "Build order could not be resolved");
        }

        for error in &result.errors {
            output::print_status(&format!("  {}", status::ERROR), error);
        }
        for warning in &result.warnings {
            output::print_status(&format!("  {}", status::WARNING), warning);
        }
    }

    if !result.is_valid() {
        bail!("Check failed with {} error(s)", result.errors.len());
    }
    Ok(())
}
