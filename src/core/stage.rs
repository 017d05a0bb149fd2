//! Source tree staging
//!
//! Makes a unit's source tree available inside its output workspace without
//! touching the original tree. Directories are linked where possible;
//! `extra_src_dirs` are always copied because they are built into themselves
//! and a shared link would let profiles overwrite each other's products.

use crate::config::defaults::{
    COMPILED_OUTPUT_DIR, LINKED_DIRS, RESOURCE_OUTPUT_DIR, RESOURCE_SRC_DIR,
};
use crate::core::unit::Unit;
use crate::error::FilesystemError;
use crate::infra::filesystem::{self, LinkMode};

/// Stages unit workspaces with a fixed link capability
#[derive(Debug, Clone, Copy)]
pub struct Stager {
    mode: LinkMode,
}

impl Stager {
    /// Create a stager using `mode` for linked directories
    pub fn new(mode: LinkMode) -> Self {
        Self { mode }
    }

    /// Prepare the output workspace of `unit`
    ///
    /// In-place units are left untouched. Missing optional directories are
    /// skipped.
    pub fn stage(&self, unit: &Unit) -> Result<(), FilesystemError> {
        if unit.is_in_place() || filesystem::same_path(&unit.source_dir, &unit.output_dir) {
            tracing::debug!("{} builds in place, nothing to stage", unit.name);
            return Ok(());
        }

        let source = &unit.source_dir;
        let output = &unit.output_dir;
        tracing::info!("Staging {} into {}", unit.name, output.display());
        filesystem::create_dir_all(output)?;

        let compiled = source.join(COMPILED_OUTPUT_DIR);
        if compiled.is_dir() {
            let target = output.join(COMPILED_OUTPUT_DIR);
            if filesystem::is_symlink(&target) {
                filesystem::remove_entry(&target)?;
            }
            filesystem::create_dir_all(&target)?;
            filesystem::copy_dir_contents(&compiled, &target)?;
        }

        for dir in LINKED_DIRS {
            filesystem::link_or_copy(self.mode, &source.join(dir), &output.join(dir))?;
        }

        let resources = source.join(RESOURCE_SRC_DIR);
        if resources.is_dir() {
            filesystem::ensure_dir(&output.join(RESOURCE_OUTPUT_DIR))?;
            filesystem::link_or_copy(self.mode, &resources, &output.join(RESOURCE_SRC_DIR))?;
        }

        for dir in &unit.options.src_dirs {
            let from = source.join(dir);
            if from.is_dir() {
                filesystem::link_or_copy(self.mode, &from, &output.join(dir))?;
            } else {
                tracing::debug!("{}: source directory {} not present", unit.name, dir);
            }
        }

        for dir in &unit.options.extra_src_dirs {
            let from = source.join(dir);
            if from.is_dir() {
                filesystem::copy_dir(&from, &output.join(dir))?;
            } else {
                tracing::debug!("{}: extra source directory {} not present", unit.name, dir);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::filesystem::{is_symlink, read_file, write_file};
    use tempfile::TempDir;

    fn unit_in(temp: &TempDir) -> Unit {
        Unit::new(
            "base",
            temp.path().join("apps/base"),
            temp.path().join("_build/default/lib/base"),
        )
    }

    #[test]
    fn test_in_place_unit_is_untouched() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("apps/base");
        write_file(&dir.join("src/a.erl"), "a").unwrap();
        let unit = Unit::new("base", &dir, &dir);

        Stager::new(LinkMode::Symlink).stage(&unit).unwrap();

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_compiled_output_is_copied() {
        let temp = TempDir::new().unwrap();
        let unit = unit_in(&temp);
        write_file(&unit.source_dir.join("ebin/prebuilt.beam"), "bin").unwrap();

        Stager::new(LinkMode::Copy).stage(&unit).unwrap();

        let staged = unit.output_dir.join("ebin/prebuilt.beam");
        assert_eq!(read_file(&staged).unwrap(), "bin");
        assert!(!is_symlink(&unit.output_dir.join("ebin")));
    }

    #[test]
    fn test_copy_mode_copies_src_dirs() {
        let temp = TempDir::new().unwrap();
        let unit = unit_in(&temp);
        write_file(&unit.source_dir.join("src/base.erl"), "code").unwrap();

        Stager::new(LinkMode::Copy).stage(&unit).unwrap();

        assert_eq!(
            read_file(&unit.output_dir.join("src/base.erl")).unwrap(),
            "code"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_priv_and_include_are_always_linked() {
        let temp = TempDir::new().unwrap();
        let unit = unit_in(&temp);
        std::fs::create_dir_all(&unit.source_dir).unwrap();

        Stager::new(LinkMode::Symlink).stage(&unit).unwrap();

        assert!(is_symlink(&unit.output_dir.join("priv")));
        assert!(is_symlink(&unit.output_dir.join("include")));
        assert!(!unit.output_dir.join("mibs").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_mibs_linked_with_companion_output() {
        let temp = TempDir::new().unwrap();
        let unit = unit_in(&temp);
        write_file(&unit.source_dir.join("mibs/SOME-MIB.mib"), "mib").unwrap();

        Stager::new(LinkMode::Symlink).stage(&unit).unwrap();

        assert!(is_symlink(&unit.output_dir.join("mibs")));
        // priv is a link, so the companion directory lands in the source tree
        assert!(unit.source_dir.join("priv/mibs").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_extra_src_dirs_are_copied_not_linked() {
        let temp = TempDir::new().unwrap();
        let mut unit = unit_in(&temp);
        unit.options.extra_src_dirs = vec!["test".to_string()];
        write_file(&unit.source_dir.join("test/base_tests.erl"), "t").unwrap();
        write_file(&unit.source_dir.join("src/base.erl"), "s").unwrap();

        Stager::new(LinkMode::Symlink).stage(&unit).unwrap();

        assert!(is_symlink(&unit.output_dir.join("src")));
        assert!(!is_symlink(&unit.output_dir.join("test")));
        assert!(unit.output_dir.join("test/base_tests.erl").is_file());
    }
}
