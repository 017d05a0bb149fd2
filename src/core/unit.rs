//! Unit descriptors
//!
//! A unit is one buildable application within the project. Descriptors are
//! values: every pipeline stage takes a unit and hands back a (possibly
//! updated) unit rather than mutating shared state.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::config::defaults::{
    COMPILED_OUTPUT_DIR, DEFAULT_SRC_DIRS, DEFAULT_VERSION, RESERVED_DIR_NAMES,
};
use crate::core::hooks::HookRegistry;
use crate::error::ManifestError;

/// Build strategy selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub enum ProjectType {
    /// The default multi-compiler pipeline
    #[default]
    Default,
    /// A registered project builder, keyed by tag
    Custom(String),
}

impl ProjectType {
    /// Tag string of this type
    pub fn tag(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::Custom(tag) => tag,
        }
    }

    /// Whether this is the default pipeline
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl From<&str> for ProjectType {
    fn from(tag: &str) -> Self {
        match tag.trim() {
            "" | "default" => Self::Default,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<ProjectType> for String {
    fn from(value: ProjectType) -> Self {
        value.tag().to_string()
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Per-unit build options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitOptions {
    /// Source directories, linked into the workspace (ordered)
    pub src_dirs: Vec<String>,
    /// Auxiliary source directories, copied into the workspace (ordered)
    pub extra_src_dirs: Vec<String>,
    /// Free-form options
    pub values: BTreeMap<String, toml::Value>,
}

impl Default for UnitOptions {
    fn default() -> Self {
        Self {
            src_dirs: DEFAULT_SRC_DIRS.iter().map(ToString::to_string).collect(),
            extra_src_dirs: Vec::new(),
            values: BTreeMap::new(),
        }
    }
}

impl UnitOptions {
    /// Build normalised options for `unit`
    ///
    /// Entries are normalised lexically (`./src` and `src/../src` are both
    /// `src`) and must stay inside the unit. Both directory lists are
    /// de-duplicated in order; an entry present in both lists is rejected.
    /// Reserved test-runner names only warn.
    pub fn normalized(
        unit: &str,
        src_dirs: Vec<String>,
        extra_src_dirs: Vec<String>,
        values: BTreeMap<String, toml::Value>,
    ) -> Result<Self, ManifestError> {
        let src_dirs = dedup(unit, src_dirs)?;
        let extra_src_dirs = dedup(unit, extra_src_dirs)?;

        if let Some(dir) = extra_src_dirs.iter().find(|d| src_dirs.contains(d)) {
            return Err(ManifestError::OverlappingSourceDirs {
                unit: unit.to_string(),
                dir: dir.clone(),
            });
        }

        for dir in src_dirs.iter().chain(&extra_src_dirs) {
            if RESERVED_DIR_NAMES.contains(&dir.as_str()) {
                tracing::warn!(
                    "Unit '{unit}' uses source directory '{dir}', which collides with a test runner directory name"
                );
            }
        }

        Ok(Self {
            src_dirs,
            extra_src_dirs,
            values,
        })
    }
}

fn dedup(unit: &str, dirs: Vec<String>) -> Result<Vec<String>, ManifestError> {
    let mut seen = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let Some(dir) = normalize_dir(&dir) else {
            return Err(ManifestError::InvalidSourceDir {
                unit: unit.to_string(),
                dir,
            });
        };
        if !dir.is_empty() && !seen.contains(&dir) {
            seen.push(dir);
        }
    }
    Ok(seen)
}

/// Lexical form of a relative directory entry
///
/// Returns `None` for absolute entries and entries escaping the unit.
fn normalize_dir(dir: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(dir).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}

/// Descriptor of one build unit
#[derive(Debug, Clone)]
pub struct Unit {
    /// Unique name within the unit set
    pub name: String,
    /// Version recorded in the application resource
    pub version: String,
    /// Source tree
    pub source_dir: PathBuf,
    /// Output workspace (equal to `source_dir` for in-place builds)
    pub output_dir: PathBuf,
    /// Build strategy
    pub project_type: ProjectType,
    /// Names of units this unit depends on
    pub deps: Vec<String>,
    /// Build options
    pub options: UnitOptions,
    /// Declared artifacts, relative to `output_dir` unless absolute
    pub artifacts: Vec<String>,
    /// Hooks registered by this unit
    pub hooks: HookRegistry,
}

impl Unit {
    /// Create a default-typed unit with default options
    pub fn new(
        name: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: DEFAULT_VERSION.to_string(),
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            project_type: ProjectType::Default,
            deps: Vec::new(),
            options: UnitOptions::default(),
            artifacts: Vec::new(),
            hooks: HookRegistry::new(),
        }
    }

    /// Set the project type
    #[must_use]
    pub fn with_project_type(mut self, project_type: impl Into<ProjectType>) -> Self {
        self.project_type = project_type.into();
        self
    }

    /// Set the dependencies
    #[must_use]
    pub fn with_deps<S: Into<String>>(mut self, deps: impl IntoIterator<Item = S>) -> Self {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set the declared artifacts
    #[must_use]
    pub fn with_artifacts<S: Into<String>>(mut self, artifacts: impl IntoIterator<Item = S>) -> Self {
        self.artifacts = artifacts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the options
    #[must_use]
    pub fn with_options(mut self, options: UnitOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the hooks
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Whether the unit builds directly in its source tree
    pub fn is_in_place(&self) -> bool {
        self.source_dir == self.output_dir
    }

    /// Compiled-output directory of the workspace
    pub fn ebin_dir(&self) -> PathBuf {
        self.output_dir.join(COMPILED_OUTPUT_DIR)
    }

    /// Whether the unit's source tree is `dir`
    pub fn is_rooted_at(&self, dir: &Path) -> bool {
        crate::infra::filesystem::same_path(&self.source_dir, dir)
    }
}
