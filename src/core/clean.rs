//! Clean logic
//!
//! Removes the build area of one profile, or the whole build directory.

use std::path::Path;

use crate::core::manifest::Layout;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Result of clean operation
#[derive(Debug, Default, serde::Serialize)]
pub struct CleanResult {
    /// Directories that were removed
    pub removed: Vec<String>,
    /// Directories that didn't exist (skipped)
    pub skipped: Vec<String>,
}

fn remove(dir: &Path, result: &mut CleanResult) -> Result<(), FilesystemError> {
    let label = dir.display().to_string();
    if dir.exists() {
        filesystem::remove_dir_all(dir)?;
        tracing::info!("Removed {}", label);
        result.removed.push(label);
    } else {
        result.skipped.push(label);
    }
    Ok(())
}

/// Clean build output for the profile described by `layout`
///
/// With `all`, the whole build directory is removed instead.
pub fn clean_project(layout: &Layout, all: bool) -> Result<CleanResult, FilesystemError> {
    let mut result = CleanResult::default();
    if all {
        remove(&layout.build_dir, &mut result)?;
    } else {
        remove(&layout.profile_dir, &mut result)?;
    }
    Ok(result)
}

/// Check if the profile described by `layout` has any build output
pub fn has_build_artifacts(layout: &Layout) -> bool {
    layout.profile_dir.exists()
}
