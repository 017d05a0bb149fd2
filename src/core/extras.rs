//! Top-level extra source directories
//!
//! Directories such as a shared `test/` tree at the project root belong to no
//! unit. Each one is copied into its own namespace below the build area and
//! compiled through the default pipeline as a synthetic unit, without hooks.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::code_path::CodePaths;
use crate::core::dispatch::Dispatcher;
use crate::core::unit::{Unit, UnitOptions};
use crate::error::CompileError;
use crate::infra::filesystem;

/// Whether top-level extra directories should be built for `units`
///
/// When a project unit lives at the root itself its extra directories are
/// already part of that unit.
pub fn should_build(root: &Path, units: &[Unit]) -> bool {
    !units.iter().any(|unit| unit.is_rooted_at(root))
}

/// Synthetic unit compiling `dir` staged below `extras_dir`
pub fn synthetic_unit(root: &Path, extras_dir: &Path, dir: &str) -> Unit {
    Unit::new(dir, root, extras_dir).with_options(UnitOptions {
        src_dirs: Vec::new(),
        extra_src_dirs: vec![dir.to_string()],
        values: BTreeMap::new(),
    })
}

/// Stage and compile each existing top-level extra directory
///
/// Returns the directories that were built. Absent directories are skipped.
pub fn build_extra_dirs(
    root: &Path,
    extras_dir: &Path,
    dirs: &[String],
    dispatcher: &Dispatcher,
    code_path: &CodePaths,
) -> Result<Vec<String>, CompileError> {
    let mut built = Vec::new();
    for dir in dirs {
        let source = root.join(dir);
        if !source.is_dir() {
            tracing::debug!("Extra directory {} not present, skipping", source.display());
            continue;
        }

        let target = extras_dir.join(dir);
        tracing::info!("Building extra directory {}", dir);
        filesystem::copy_dir(&source, &target)?;

        let unit = synthetic_unit(root, extras_dir, dir);
        dispatcher.compile_all(&unit, code_path)?;
        built.push(dir.clone());
    }
    Ok(built)
}
