//! Check command logic
//!
//! Validates configuration, resolves build order, checks project builders
//! and command programs, and reports what would be built without building.

use std::collections::BTreeSet;
use std::path::Path;

use crate::core::manifest::Manifest;
use crate::core::resolver;
use crate::core::unit::{ProjectType, Unit};
use crate::infra::process;

/// Result of the check operation
#[derive(Debug, serde::Serialize)]
pub struct CheckResult {
    /// Whether the configuration is valid
    pub config_valid: bool,
    /// Whether build order could be resolved
    pub dependencies_valid: bool,
    /// Whether every configured program was found on `PATH`
    pub programs_available: bool,
    /// Dependency units in build order
    pub dependency_order: Vec<String>,
    /// Project units in build order
    pub build_order: Vec<String>,
    /// Configured programs not found on `PATH`
    pub missing_programs: Vec<String>,
    /// Fatal problems
    pub errors: Vec<String>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
}

impl CheckResult {
    /// Create a new check result
    pub fn new() -> Self {
        Self {
            config_valid: true,
            dependencies_valid: true,
            programs_available: true,
            dependency_order: Vec::new(),
            build_order: Vec::new(),
            missing_programs: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check if all validations passed
    pub fn is_valid(&self) -> bool {
        self.config_valid && self.dependencies_valid
    }
}

impl Default for CheckResult {
    fn default() -> Self {
        Self::new()
    }
}

fn order_names(units: Vec<Unit>, result: &mut CheckResult) -> Vec<String> {
    match resolver::order_units(units) {
        Ok(order) => order.into_iter().map(|u| u.name).collect(),
        Err(e) => {
            result.dependencies_valid = false;
            result.errors.push(format!("Dependency resolution failed: {e}"));
            Vec::new()
        }
    }
}

/// Perform check operation on a project
pub fn check(root: &Path, manifest: &Manifest, profile: &str) -> CheckResult {
    let mut result = CheckResult::new();

    result.errors = manifest.validate(root);

    let units = match manifest.project_units(root, profile) {
        Ok(units) => units,
        Err(e) => {
            result.errors.push(e.to_string());
            Vec::new()
        }
    };
    if units.is_empty() && result.errors.is_empty() {
        result
            .warnings
            .push("No units declared and no src/ directory at the project root".to_string());
    }

    let dispatcher = manifest.dispatcher();
    for unit in &units {
        if let ProjectType::Custom(tag) = &unit.project_type {
            if !dispatcher.builders().contains(tag) {
                result.errors.push(format!(
                    "Unknown project type '{tag}' for application '{}'",
                    unit.name
                ));
            }
        }
    }
    result.config_valid = result.errors.is_empty();

    result.dependency_order = order_names(manifest.dependency_units(root, profile), &mut result);
    result.build_order = order_names(units, &mut result);

    let commands = manifest
        .compilers
        .iter()
        .map(|c| c.command.as_str())
        .chain(manifest.builders.values().map(|b| b.command.as_str()))
        .chain(manifest.hooks.iter().map(|h| h.command.as_str()))
        .chain(
            manifest
                .units
                .values()
                .flat_map(|u| u.hooks.iter().map(|h| h.command.as_str())),
        );
    let mut missing = BTreeSet::new();
    for command in commands {
        if !process::program_available(command) {
            if let Some(program) = process::program_name(command) {
                missing.insert(program.to_string());
            }
        }
    }
    for program in &missing {
        result
            .warnings
            .push(format!("Program '{program}' not found in PATH"));
    }
    result.programs_available = missing.is_empty();
    result.missing_programs = missing.into_iter().collect();

    tracing::debug!(
        "Check finished: {} errors, {} warnings",
        result.errors.len(),
        result.warnings.len()
    );
    result
}
