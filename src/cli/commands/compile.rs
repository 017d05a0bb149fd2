//! Compile command implementation
//!
//! Implements `stagecraft compile`: loads the manifest, runs the build
//! orchestrator on a blocking worker and reports the resulting code path.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{self, create_spinner, status, OutputConfig};
use crate::config::defaults::DEFAULT_PROFILE;
use crate::core::code_path::CodePaths;
use crate::core::manifest::Manifest;

/// Compile options
#[derive(Debug, Default)]
pub struct CompileOptions {
    /// Only build dependency units
    pub deps_only: bool,
    /// Build profile
    pub profile: Option<String>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

/// Execute the compile command
pub async fn execute(project_dir: &Path, options: CompileOptions) -> Result<()> {
    let manifest = Manifest::load_from_dir(project_dir)
        .with_context(|| format!("Failed to load manifest in {}", project_dir.display()))?;
    let profile = options
        .profile
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    tracing::info!(
        "Compiling project '{}' with profile '{}'",
        manifest.project.name,
        profile
    );

    let mut orchestrator = manifest
        .orchestrator(project_dir, &profile)?
        .deps_only(options.deps_only);
    match options.jobs {
        Some(0) => orchestrator = orchestrator.with_jobs(num_cpus::get()),
        Some(jobs) => orchestrator = orchestrator.with_jobs(jobs),
        None => {}
    }

    let spinner = create_spinner("Compiling...");
    let outcome = tokio::task::spawn_blocking(move || orchestrator.run(CodePaths::new()))
        .await
        .context("Compile task panicked")?;
    spinner.finish_and_clear();
    let report = outcome?;

    if OutputConfig::global().json {
        return output::print_json(&report);
    }

    if report.deps_only {
        output::print_status(
            status::SUCCESS,
            &format!("Built {} dependencies", report.dependencies.len()),
        );
    } else {
        output::print_status(
            status::SUCCESS,
            &format!(
                "Compiled {} units ({}) with profile '{}'",
                report.units.len(),
                report.units.join(", "),
                report.profile
            ),
        );
        for dir in &report.extras {
            output::print_status(status::INFO, &format!("Built extra directory {dir}"));
        }
    }
    for path in &report.global_path {
        tracing::info!("Code path: {}", path.display());
    }

    Ok(())
}
