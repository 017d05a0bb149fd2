//! Artifact verification
//!
//! Declared artifacts are templates: `{name}` expands to the unit name and
//! relative paths resolve against the unit's output directory.

use std::path::PathBuf;

use crate::core::unit::Unit;
use crate::error::CompileError;

/// Resolve the declared artifacts of `unit` to concrete paths
pub fn artifact_paths(unit: &Unit) -> Vec<PathBuf> {
    unit.artifacts
        .iter()
        .map(|template| {
            let expanded = PathBuf::from(template.replace("{name}", &unit.name));
            if expanded.is_absolute() {
                expanded
            } else {
                unit.output_dir.join(expanded)
            }
        })
        .collect()
}

/// Check that every declared artifact of `unit` exists
pub fn verify(unit: &Unit) -> Result<(), CompileError> {
    for path in artifact_paths(unit) {
        if !path.exists() {
            tracing::debug!("{}: artifact {} not found", unit.name, path.display());
            return Err(CompileError::MissingArtifact { path });
        }
    }
    Ok(())
}

/// Check the artifacts of every unit, in order
pub fn verify_all(units: &[Unit]) -> Result<(), CompileError> {
    units.iter().try_for_each(verify)
}
