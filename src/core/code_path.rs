//! Code-path management
//!
//! The code path is the ordered list of output directories other tooling
//! searches for build products. It is held in an explicit, versioned context
//! that the orchestrator threads through a run and returns at the end.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::unit::Unit;

/// Which resolution paths are visible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathScope {
    /// The global code path only
    #[default]
    Default,
    /// Plugin paths ahead of the global code path (custom builders)
    Plugins,
}

/// Code-path context
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodePaths {
    version: u64,
    deps: Vec<PathBuf>,
    project_apps: Vec<PathBuf>,
    extras: Vec<PathBuf>,
    plugins: Vec<PathBuf>,
    scope: PathScope,
}

impl CodePaths {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of updates applied to this context
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the dependency segment
    pub fn set_deps(&mut self, paths: Vec<PathBuf>) {
        self.deps = existing(paths);
        self.bump("deps", self.deps.len());
    }

    /// Replace the project-app segment
    pub fn set_project_apps(&mut self, paths: Vec<PathBuf>) {
        self.project_apps = existing(paths);
        self.bump("project apps", self.project_apps.len());
    }

    /// Replace the extra segment
    pub fn set_extras(&mut self, paths: Vec<PathBuf>) {
        self.extras = existing(paths);
        self.bump("extras", self.extras.len());
    }

    /// Replace the plugin paths visible to custom builders
    pub fn set_plugins(&mut self, paths: Vec<PathBuf>) {
        self.plugins = existing(paths);
        self.bump("plugins", self.plugins.len());
    }

    fn bump(&mut self, segment: &str, len: usize) {
        self.version += 1;
        tracing::debug!(
            "Code path {} segment updated ({} dirs, version {})",
            segment,
            len,
            self.version
        );
    }

    /// Dependency segment
    pub fn deps(&self) -> &[PathBuf] {
        &self.deps
    }

    /// Project-app segment
    pub fn project_apps(&self) -> &[PathBuf] {
        &self.project_apps
    }

    /// Global code path: dependencies, then project apps, then extras
    pub fn global(&self) -> Vec<PathBuf> {
        self.deps
            .iter()
            .chain(&self.project_apps)
            .chain(&self.extras)
            .cloned()
            .collect()
    }

    /// Currently visible resolution paths
    pub fn active(&self) -> Vec<PathBuf> {
        match self.scope {
            PathScope::Default => self.global(),
            PathScope::Plugins => self.plugins.iter().cloned().chain(self.global()).collect(),
        }
    }

    /// Current scope
    pub fn scope(&self) -> PathScope {
        self.scope
    }

    /// Switch to `scope` until the returned guard is dropped
    pub fn enter(&mut self, scope: PathScope) -> ScopeGuard<'_> {
        let previous = self.scope;
        self.scope = scope;
        ScopeGuard {
            paths: self,
            previous,
        }
    }

    /// Active paths joined with the platform separator
    pub fn to_env_value(&self) -> String {
        std::env::join_paths(self.active())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Restores the previous [`PathScope`] when dropped
pub struct ScopeGuard<'a> {
    paths: &'a mut CodePaths,
    previous: PathScope,
}

impl Deref for ScopeGuard<'_> {
    type Target = CodePaths;

    fn deref(&self) -> &CodePaths {
        self.paths
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.paths.scope = self.previous;
    }
}

/// Candidate code paths of one unit: its compiled output plus each copied
/// extra source directory (those are built into themselves)
pub fn unit_paths(unit: &Unit) -> Vec<PathBuf> {
    std::iter::once(unit.ebin_dir())
        .chain(
            unit.options
                .extra_src_dirs
                .iter()
                .map(|dir| unit.output_dir.join(dir)),
        )
        .collect()
}

/// Project-app segment for units in build order
pub fn project_app_paths(units: &[Unit]) -> Vec<PathBuf> {
    units.iter().flat_map(unit_paths).collect()
}

/// Extra segment for top-level extra directories staged under `extras_dir`
pub fn extra_paths(extras_dir: &Path, dirs: &[String]) -> Vec<PathBuf> {
    dirs.iter().map(|dir| extras_dir.join(dir)).collect()
}

fn existing(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut kept: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if path.is_dir() && !kept.contains(&path) {
            kept.push(path);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir(root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn test_global_orders_segments() {
        let temp = TempDir::new().unwrap();
        let dep = dir(temp.path(), "deps/lib/ebin");
        let app = dir(temp.path(), "lib/app/ebin");
        let extra = dir(temp.path(), "extras/test");

        let mut paths = CodePaths::new();
        paths.set_extras(vec![extra.clone()]);
        paths.set_project_apps(vec![app.clone()]);
        paths.set_deps(vec![dep.clone()]);

        assert_eq!(paths.global(), vec![dep, app, extra]);
        assert_eq!(paths.version(), 3);
    }

    #[test]
    fn test_missing_directories_are_dropped() {
        let temp = TempDir::new().unwrap();
        let present = dir(temp.path(), "present");

        let mut paths = CodePaths::new();
        paths.set_project_apps(vec![temp.path().join("absent"), present.clone(), present.clone()]);

        assert_eq!(paths.project_apps(), &[present]);
    }

    #[test]
    fn test_scope_guard_restores_default() {
        let temp = TempDir::new().unwrap();
        let plugin = dir(temp.path(), "plugin/ebin");
        let app = dir(temp.path(), "app/ebin");

        let mut paths = CodePaths::new();
        paths.set_plugins(vec![plugin.clone()]);
        paths.set_project_apps(vec![app.clone()]);

        {
            let scoped = paths.enter(PathScope::Plugins);
            assert_eq!(scoped.active(), vec![plugin, app.clone()]);
        }

        assert_eq!(paths.scope(), PathScope::Default);
        assert_eq!(paths.active(), vec![app]);
    }

    #[test]
    fn test_unit_paths_include_extra_dirs() {
        let mut unit = Unit::new("a", "/src/a", "/out/a");
        unit.options.extra_src_dirs = vec!["test".to_string()];
        assert_eq!(
            unit_paths(&unit),
            vec![PathBuf::from("/out/a/ebin"), PathBuf::from("/out/a/test")]
        );
    }
}
