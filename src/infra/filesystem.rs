//! Filesystem operations
//!
//! Handles file and directory operations, including the link-or-copy
//! capability used to stage unit workspaces.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::Remove {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Create `path`, resolving any symbolic links among its ancestors first
///
/// Unlike [`create_dir_all`] this also works when an ancestor is a link
/// whose target does not exist yet: the target side is created.
pub fn ensure_dir(path: &Path) -> Result<(), FilesystemError> {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        resolved.push(component);
        if is_symlink(&resolved) {
            if let Ok(target) = std::fs::read_link(&resolved) {
                resolved = match resolved.parent() {
                    Some(parent) if target.is_relative() => parent.join(target),
                    _ => target,
                };
            }
        }
    }
    create_dir_all(&resolved)
}

/// Whether `path` itself is a symbolic link (the link is not followed)
pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Remove whatever sits at `path` without following symbolic links
pub fn remove_entry(path: &Path) -> Result<(), FilesystemError> {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return Ok(());
    };
    let result = if meta.file_type().is_symlink() {
        remove_link(path)
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| FilesystemError::Remove {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(unix)]
fn remove_link(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)
}

#[cfg(windows)]
fn remove_link(path: &Path) -> std::io::Result<()> {
    // Directory symlinks are removed as directories on Windows
    std::fs::remove_dir(path).or_else(|_| std::fs::remove_file(path))
}

/// Compare two paths after resolving them, falling back to the literal paths
pub fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// How directories are made visible inside a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Symbolic links pointing back at the source tree
    Symlink,
    /// Recursive copies
    Copy,
}

impl LinkMode {
    /// Probe whether symbolic links can be created under `scratch_dir`
    ///
    /// Copy is the fallback whenever the probe fails.
    pub fn probe(scratch_dir: &Path) -> Self {
        if create_dir_all(scratch_dir).is_err() {
            return Self::Copy;
        }
        let target = scratch_dir.join(".stagecraft-probe-target");
        let link = scratch_dir.join(".stagecraft-probe-link");
        discard_probe_entry(&link);

        let mode = if std::fs::create_dir_all(&target).is_ok()
            && make_symlink(&target, &link).is_ok()
        {
            Self::Symlink
        } else {
            Self::Copy
        };

        discard_probe_entry(&link);
        discard_probe_entry(&target);
        tracing::debug!("Link capability probe selected {:?}", mode);
        mode
    }
}

fn discard_probe_entry(path: &Path) {
    if let Err(e) = remove_entry(path) {
        tracing::debug!("Leaving probe entry behind: {e}");
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

/// Link `source` to `target`, or copy it when links are unavailable
///
/// In symlink mode the link is created even when `source` does not exist yet,
/// so anything created later through either path is visible from both.
/// A link that already points at `source` is left untouched.
pub fn link_or_copy(mode: LinkMode, source: &Path, target: &Path) -> Result<(), FilesystemError> {
    match mode {
        LinkMode::Symlink => symlink_dir(source, target),
        LinkMode::Copy => {
            if source.exists() {
                copy_dir(source, target)
            } else {
                tracing::debug!("Nothing to copy from {}", source.display());
                Ok(())
            }
        }
    }
}

fn symlink_dir(source: &Path, target: &Path) -> Result<(), FilesystemError> {
    let source = absolute(source);
    if is_symlink(target) {
        if std::fs::read_link(target).is_ok_and(|existing| existing == source) {
            return Ok(());
        }
        remove_entry(target)?;
    } else if target.exists() {
        if same_path(&source, target) {
            return Ok(());
        }
        remove_entry(target)?;
    }

    if let Some(parent) = target.parent() {
        create_dir_all(parent)?;
    }
    make_symlink(&source, target).map_err(|e| FilesystemError::Link {
        target: source.clone(),
        link: target.to_path_buf(),
        error: e.to_string(),
    })
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Recursively copy the directory `source` onto `target`
///
/// Copying a directory onto itself is a no-op. A symbolic link at the target,
/// or at any path written below it, is unlinked before copying so the data it
/// points to is never truncated.
pub fn copy_dir(source: &Path, target: &Path) -> Result<(), FilesystemError> {
    if is_symlink(target) {
        remove_entry(target)?;
    }
    if same_path(source, target) {
        tracing::debug!("Skipping copy of {} onto itself", source.display());
        return Ok(());
    }
    create_dir_all(target)?;
    copy_dir_contents(source, target)
}

/// Copy every entry below `source` into `target`
pub fn copy_dir_contents(source: &Path, target: &Path) -> Result<(), FilesystemError> {
    for entry in WalkDir::new(source).min_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {e}", source.display());
                continue;
            }
        };
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let dest = target.join(relative);

        if is_symlink(&dest) {
            remove_entry(&dest)?;
        }

        if entry.file_type().is_dir() {
            create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &dest).map_err(|e| FilesystemError::Copy {
                from: entry.path().to_path_buf(),
                to: dest.clone(),
                error: e.to_string(),
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_onto_itself_is_noop() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("src");
        write_file(&dir.join("a.txt"), "data").unwrap();

        copy_dir(&dir, &dir).unwrap();

        assert_eq!(read_file(&dir.join("a.txt")).unwrap(), "data");
    }

    #[test]
    fn test_copy_dir_copies_nested_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write_file(&src.join("nested/deep/a.txt"), "deep").unwrap();

        let dst = temp.path().join("dst");
        copy_dir(&src, &dst).unwrap();

        assert_eq!(read_file(&dst.join("nested/deep/a.txt")).unwrap(), "deep");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_replaces_symlinked_target() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write_file(&src.join("a.txt"), "original").unwrap();

        let dst = temp.path().join("dst");
        std::os::unix::fs::symlink(&src, &dst).unwrap();

        copy_dir(&src, &dst).unwrap();

        assert!(!is_symlink(&dst));
        assert_eq!(read_file(&src.join("a.txt")).unwrap(), "original");
        assert_eq!(read_file(&dst.join("a.txt")).unwrap(), "original");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_unlinks_symlinked_file_below_target() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write_file(&src.join("nested/a.txt"), "fresh").unwrap();
        let outside = temp.path().join("outside.txt");
        write_file(&outside, "keep me").unwrap();

        let dst = temp.path().join("dst");
        create_dir_all(&dst.join("nested")).unwrap();
        std::os::unix::fs::symlink(&outside, dst.join("nested/a.txt")).unwrap();

        copy_dir(&src, &dst).unwrap();

        assert!(!is_symlink(&dst.join("nested/a.txt")));
        assert_eq!(read_file(&dst.join("nested/a.txt")).unwrap(), "fresh");
        assert_eq!(read_file(&outside).unwrap(), "keep me");
    }

    #[test]
    fn test_link_detection_leaves_no_scratch_entries() {
        let temp = TempDir::new().unwrap();
        LinkMode::probe(temp.path());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_missing_source_is_created() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source/priv");
        let target = temp.path().join("out/priv");

        link_or_copy(LinkMode::Symlink, &source, &target).unwrap();
        assert!(is_symlink(&target));

        // Created later through the link, visible from the source side
        write_file(&target.join("data.bin"), "x").unwrap();
        assert!(source.join("data.bin").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_relinking_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source/include");
        create_dir_all(&source).unwrap();
        let target = temp.path().join("out/include");

        link_or_copy(LinkMode::Symlink, &source, &target).unwrap();
        link_or_copy(LinkMode::Symlink, &source, &target).unwrap();

        assert_eq!(std::fs::read_link(&target).unwrap(), source);
    }

    #[test]
    fn test_copy_mode_skips_missing_source() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out/priv");

        link_or_copy(LinkMode::Copy, &temp.path().join("missing"), &target).unwrap();

        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_selects_symlink_on_unix() {
        let temp = TempDir::new().unwrap();
        assert_eq!(LinkMode::probe(temp.path()), LinkMode::Symlink);
    }
}
