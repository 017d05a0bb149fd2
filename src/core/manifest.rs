//! Manifest (stagecraft.toml) parsing and validation
//!
//! The manifest declares the project units, dependency units, compilers,
//! project builders and hooks of a project. Supports environment variable
//! substitution using ${VAR} syntax and `extends = "<file>"` inheritance.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::defaults::{
    DEFAULT_BUILD_DIR, DEFAULT_BUILD_JOBS, DEFAULT_SRC_DIRS, EXTRAS_DIR, LIB_DIR, MANIFEST_FILE,
};
use crate::core::builder::BuildOrchestrator;
use crate::core::dispatch::{BuilderRegistry, CommandBuilder, CommandCompiler, Dispatcher};
use crate::core::hooks::{HookRegistry, Phase, ShellHook, Stage};
use crate::core::unit::{Unit, UnitOptions};
use crate::error::ManifestError;
use crate::infra::filesystem::LinkMode;

/// The project manifest (stagecraft.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Project metadata
    #[serde(default)]
    pub project: ProjectConfig,
    /// Build area settings
    #[serde(default)]
    pub build: BuildConfig,
    /// Named build profiles
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
    /// Default compiler pipeline, in order
    #[serde(default)]
    pub compilers: Vec<CompilerConfig>,
    /// Project builders keyed by project type
    #[serde(default)]
    pub builders: BTreeMap<String, BuilderConfig>,
    /// Project-level hooks
    #[serde(default)]
    pub hooks: Vec<HookSpec>,
    /// Project units
    #[serde(default)]
    pub units: BTreeMap<String, UnitConfig>,
    /// Dependency units
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyConfig>,
}

/// Project-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default)]
    pub name: String,
    /// Source directories for units that declare none
    #[serde(default = "default_src_dirs")]
    pub src_dirs: Vec<String>,
    /// Top-level extra source directories
    #[serde(default)]
    pub extra_src_dirs: Vec<String>,
}

fn default_src_dirs() -> Vec<String> {
    DEFAULT_SRC_DIRS.iter().map(ToString::to_string).collect()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            src_dirs: default_src_dirs(),
            extra_src_dirs: Vec::new(),
        }
    }
}

/// How staged directories are linked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkSetting {
    /// Probe for symbolic link support
    #[default]
    Auto,
    /// Always copy
    Copy,
}

/// Build configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Build area, relative to the project root
    #[serde(default = "default_build_dir")]
    pub dir: String,
    /// Number of parallel jobs
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Link strategy
    #[serde(default)]
    pub link: LinkSetting,
}

fn default_build_dir() -> String {
    DEFAULT_BUILD_DIR.to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dir: default_build_dir(),
            jobs: None,
            link: LinkSetting::Auto,
        }
    }
}

/// Profile overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Extra source directories added for every unit and the project
    #[serde(default)]
    pub extra_src_dirs: Vec<String>,
}

/// A compiler of the default pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Compiler name
    pub name: String,
    /// Source file extensions handled, without the dot
    pub extensions: Vec<String>,
    /// Command template
    pub command: String,
}

/// A project builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Command run in the unit workspace
    pub command: String,
    /// Extra resolution paths visible while the builder runs
    #[serde(default)]
    pub paths: Vec<String>,
}

/// A hook declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    /// `compile`, `unit_compile` or `app_compile`
    pub stage: String,
    /// `pre` or `post`
    pub phase: String,
    /// Shell command
    pub command: String,
}

/// A project unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Source directory, relative to the project root
    pub path: String,
    /// Version
    #[serde(default)]
    pub version: Option<String>,
    /// Project type
    #[serde(default, rename = "type")]
    pub project_type: Option<String>,
    /// Units this unit depends on
    #[serde(default)]
    pub deps: Vec<String>,
    /// Declared artifacts
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Source directories
    #[serde(default)]
    pub src_dirs: Option<Vec<String>>,
    /// Auxiliary source directories
    #[serde(default)]
    pub extra_src_dirs: Vec<String>,
    /// Build directly in the source tree
    #[serde(default)]
    pub in_place: bool,
    /// Unit hooks
    #[serde(default)]
    pub hooks: Vec<HookSpec>,
    /// Free-form options
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

/// A dependency unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Source directory, relative to the project root
    pub path: String,
    /// Version
    #[serde(default)]
    pub version: Option<String>,
    /// Project type
    #[serde(default, rename = "type")]
    pub project_type: Option<String>,
    /// Other dependency units this one depends on
    #[serde(default)]
    pub deps: Vec<String>,
    /// Declared artifacts
    #[serde(default)]
    pub artifacts: Vec<String>,
}

/// Resolved build-area layout for one profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Project root
    pub root: PathBuf,
    /// Build area
    pub build_dir: PathBuf,
    /// Profile directory inside the build area
    pub profile_dir: PathBuf,
    /// Unit workspaces
    pub lib_dir: PathBuf,
    /// Top-level extra directories
    pub extras_dir: PathBuf,
}

/// Substitute environment variables in a string using ${VAR} syntax.
///
/// Unset variables expand to the empty string.
///
/// # Examples
/// ```
/// use stagecraft::core::manifest::substitute_env_vars;
///
/// std::env::set_var("STAGECRAFT_DOC_VAR", "hello");
/// let result = substitute_env_vars("prefix_${STAGECRAFT_DOC_VAR}_suffix").unwrap();
/// assert_eq!(result, "prefix_hello_suffix");
/// std::env::remove_var("STAGECRAFT_DOC_VAR");
/// ```
pub fn substitute_env_vars(input: &str) -> Result<String, String> {
    let re =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| format!("Invalid regex: {e}"))?;

    let mut last_end = 0;
    let mut output = String::new();

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        output.push_str(&input[last_end..full_match.start()]);
        output.push_str(&std::env::var(&cap[1]).unwrap_or_default());
        last_end = full_match.end();
    }

    output.push_str(&input[last_end..]);
    Ok(output)
}

/// Recursively substitute environment variables in a TOML value
fn substitute_in_value(value: &mut toml::Value) -> Result<(), String> {
    match value {
        toml::Value::String(s) => {
            *s = substitute_env_vars(s)?;
        }
        toml::Value::Array(arr) => {
            for item in arr.iter_mut() {
                substitute_in_value(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                substitute_in_value(v)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Merge two TOML tables, with `override_table` values taking precedence.
/// This performs a deep merge for nested tables.
fn merge_toml_tables(base: &mut toml::value::Table, override_table: &toml::value::Table) {
    for (key, override_value) in override_table {
        match (base.get_mut(key), override_value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(override_table)) => {
                merge_toml_tables(base_table, override_table);
            }
            _ => {
                base.insert(key.clone(), override_value.clone());
            }
        }
    }
}

/// Load a TOML file and resolve its `extends` directive recursively.
fn load_toml_with_inheritance(path: &Path, seen: &mut Vec<PathBuf>) -> Result<toml::Value, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if seen.contains(&canonical) {
        return Err(ManifestError::Invalid(format!(
            "'{}' extends itself",
            path.display()
        )));
    }
    seen.push(canonical);

    let content = std::fs::read_to_string(path).map_err(|e| ManifestError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let mut value: toml::Value =
        toml::from_str(&content).map_err(|source| ManifestError::Parse { source })?;

    if let Some(extends) = value.get("extends").and_then(|v| v.as_str()) {
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let base_path = base_dir.join(extends);
        tracing::debug!("{} extends {}", path.display(), base_path.display());

        let base_value = load_toml_with_inheritance(&base_path, seen)?;
        if let (toml::Value::Table(mut merged), toml::Value::Table(current)) = (base_value, &value) {
            merge_toml_tables(&mut merged, current);
            value = toml::Value::Table(merged);
        }
    }

    if let toml::Value::Table(table) = &mut value {
        table.remove("extends");
    }

    Ok(value)
}

/// Build a hook registry from declarations
fn hook_registry(owner: &str, specs: &[HookSpec]) -> Result<HookRegistry, ManifestError> {
    let mut registry = HookRegistry::new();
    for spec in specs {
        let invalid = |message: String| ManifestError::InvalidHook {
            owner: owner.to_string(),
            message,
        };
        let stage: Stage = spec.stage.parse().map_err(invalid)?;
        let phase: Phase = spec.phase.parse().map_err(invalid)?;
        registry.register(stage, phase, ShellHook::new(&spec.command));
    }
    Ok(registry)
}

impl Manifest {
    /// Load a manifest with inheritance and environment substitution
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let mut value = load_toml_with_inheritance(path, &mut Vec::new())?;
        substitute_in_value(&mut value).map_err(ManifestError::Invalid)?;
        let manifest: Self = value
            .try_into()
            .map_err(|source| ManifestError::Parse { source })?;
        tracing::debug!(
            "Loaded manifest for '{}' with {} units",
            manifest.project.name,
            manifest.units.len()
        );
        Ok(manifest)
    }

    /// Load the manifest of the project at `root`
    pub fn load_from_dir(root: &Path) -> Result<Self, ManifestError> {
        Self::load(&root.join(MANIFEST_FILE))
    }

    /// Load manifest from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Build-area layout for `profile`
    pub fn layout(&self, root: &Path, profile: &str) -> Layout {
        let build_dir = root.join(&self.build.dir);
        let profile_dir = build_dir.join(profile);
        Layout {
            root: root.to_path_buf(),
            lib_dir: profile_dir.join(LIB_DIR),
            extras_dir: profile_dir.join(EXTRAS_DIR),
            build_dir,
            profile_dir,
        }
    }

    fn profile_extra_dirs(&self, profile: &str) -> Vec<String> {
        self.profiles
            .get(profile)
            .map(|p| p.extra_src_dirs.clone())
            .unwrap_or_default()
    }

    /// Top-level extra source directories for `profile`
    pub fn project_extra_dirs(&self, profile: &str) -> Vec<String> {
        let mut dirs = self.project.extra_src_dirs.clone();
        for dir in self.profile_extra_dirs(profile) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    /// Project units for `profile`, with normalised options
    ///
    /// Without declared units a project whose root has a `src/` directory is
    /// itself the single unit.
    pub fn project_units(&self, root: &Path, profile: &str) -> Result<Vec<Unit>, ManifestError> {
        let layout = self.layout(root, profile);
        let profile_extras = self.profile_extra_dirs(profile);

        if self.units.is_empty() {
            if !root.join(DEFAULT_SRC_DIRS[0]).is_dir() {
                return Ok(Vec::new());
            }
            if self.project.name.is_empty() {
                return Err(ManifestError::Invalid(
                    "project.name is required when the project root is a unit".to_string(),
                ));
            }
            let extra = [self.project.extra_src_dirs.clone(), profile_extras].concat();
            let options = UnitOptions::normalized(
                &self.project.name,
                self.project.src_dirs.clone(),
                extra,
                BTreeMap::new(),
            )?;
            let unit = Unit::new(
                &self.project.name,
                root,
                layout.lib_dir.join(&self.project.name),
            )
            .with_options(options)
            .with_hooks(hook_registry(&self.project.name, &self.hooks)?);
            return Ok(vec![unit]);
        }

        self.units
            .iter()
            .map(|(name, config)| {
                let source_dir = root.join(&config.path);
                let output_dir = if config.in_place {
                    source_dir.clone()
                } else {
                    layout.lib_dir.join(name)
                };
                let src_dirs = config
                    .src_dirs
                    .clone()
                    .unwrap_or_else(|| self.project.src_dirs.clone());
                let extra = [config.extra_src_dirs.clone(), profile_extras.clone()].concat();
                let options =
                    UnitOptions::normalized(name, src_dirs, extra, config.options.clone())?;

                let mut unit = Unit::new(name, source_dir, output_dir)
                    .with_project_type(config.project_type.as_deref().unwrap_or_default())
                    .with_deps(config.deps.iter().cloned())
                    .with_artifacts(config.artifacts.iter().cloned())
                    .with_options(options)
                    .with_hooks(hook_registry(name, &config.hooks)?);
                if let Some(version) = &config.version {
                    unit = unit.with_version(version);
                }
                Ok(unit)
            })
            .collect()
    }

    /// Dependency units for `profile`
    pub fn dependency_units(&self, root: &Path, profile: &str) -> Vec<Unit> {
        let layout = self.layout(root, profile);
        self.dependencies
            .iter()
            .map(|(name, config)| {
                let mut unit = Unit::new(name, root.join(&config.path), layout.lib_dir.join(name))
                    .with_project_type(config.project_type.as_deref().unwrap_or_default())
                    .with_deps(config.deps.iter().cloned())
                    .with_artifacts(config.artifacts.iter().cloned());
                if let Some(version) = &config.version {
                    unit = unit.with_version(version);
                }
                unit
            })
            .collect()
    }

    /// Dispatcher holding the configured compilers and builders
    pub fn dispatcher(&self) -> Dispatcher {
        let mut builders = BuilderRegistry::new();
        for (tag, config) in &self.builders {
            builders.register(tag, CommandBuilder::new(&config.command));
        }
        self.compilers
            .iter()
            .fold(Dispatcher::new().with_builders(builders), |dispatcher, c| {
                dispatcher.with_compiler(CommandCompiler::new(
                    &c.name,
                    c.extensions.clone(),
                    &c.command,
                ))
            })
    }

    /// Project-level hooks
    ///
    /// When the root is itself the unit its hooks run per unit instead.
    pub fn project_hooks(&self) -> Result<HookRegistry, ManifestError> {
        if self.units.is_empty() {
            return Ok(HookRegistry::new());
        }
        hook_registry(&self.project.name, &self.hooks)
    }

    /// Resolution paths visible to custom project builders
    pub fn plugin_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.builders
            .values()
            .flat_map(|b| b.paths.iter().map(|p| root.join(p)))
            .collect()
    }

    /// Forced link capability, if any
    pub fn link_mode(&self) -> Option<LinkMode> {
        match self.build.link {
            LinkSetting::Auto => None,
            LinkSetting::Copy => Some(LinkMode::Copy),
        }
    }

    /// Configured number of jobs
    pub fn jobs(&self) -> usize {
        self.build.jobs.unwrap_or(DEFAULT_BUILD_JOBS)
    }

    /// Validate the manifest and report all errors found, not just the first
    pub fn validate(&self, root: &Path) -> Vec<String> {
        let mut errors = Vec::new();

        if self.build.dir.is_empty() {
            errors.push("Field 'build.dir' cannot be empty".to_string());
        }
        if self.build.jobs == Some(0) {
            errors.push("Field 'build.jobs' must be at least 1".to_string());
        }
        for (index, compiler) in self.compilers.iter().enumerate() {
            if compiler.extensions.is_empty() {
                errors.push(format!(
                    "Compiler '{}' (#{}) handles no extensions",
                    compiler.name,
                    index + 1
                ));
            }
        }
        for (name, unit) in &self.units {
            if self.dependencies.contains_key(name) {
                errors.push(format!("'{name}' is declared both as a unit and a dependency"));
            }
            if !root.join(&unit.path).is_dir() {
                errors.push(format!("Unit '{name}' source directory '{}' does not exist", unit.path));
            }
        }
        for (name, dep) in &self.dependencies {
            if !root.join(&dep.path).is_dir() {
                errors.push(format!(
                    "Dependency '{name}' source directory '{}' does not exist",
                    dep.path
                ));
            }
        }
        if let Err(e) = hook_registry(&self.project.name, &self.hooks) {
            errors.push(e.to_string());
        }
        for (name, unit) in &self.units {
            if let Err(e) = hook_registry(name, &unit.hooks) {
                errors.push(e.to_string());
            }
        }

        errors
    }

    /// Orchestrator for a compile run of `profile`
    pub fn orchestrator(&self, root: &Path, profile: &str) -> Result<BuildOrchestrator, ManifestError> {
        let layout = self.layout(root, profile);
        let mut orchestrator = BuildOrchestrator::new(root, &layout.profile_dir)
            .with_profile(profile)
            .with_units(self.project_units(root, profile)?)
            .with_dependencies(self.dependency_units(root, profile))
            .with_extra_dirs(self.project_extra_dirs(profile))
            .with_dispatcher(self.dispatcher())
            .with_hooks(self.project_hooks()?)
            .with_plugin_paths(self.plugin_paths(root))
            .with_jobs(self.jobs());
        if let Some(mode) = self.link_mode() {
            orchestrator = orchestrator.with_link_mode(mode);
        }
        Ok(orchestrator)
    }
}
