//! Builder dispatch
//!
//! Units of the default project type go through the multi-compiler pipeline;
//! any other type is looked up in the project-builder registry.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::config::defaults::COMPILED_OUTPUT_DIR;
use crate::core::code_path::{CodePaths, PathScope};
use crate::core::hooks::unit_env;
use crate::core::unit::{ProjectType, Unit};
use crate::error::CompileError;
use crate::infra::{filesystem, process};

/// A compiler of the default pipeline
pub trait Compiler: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Compile the staged sources of `unit`
    fn compile(&self, unit: &Unit, code_path: &CodePaths) -> Result<(), String>;
}

/// A project builder for a non-default project type
pub trait ProjectBuilder: Send + Sync {
    /// Build `unit`, with `code_path` scoped for add-on code
    fn build(&self, unit: &Unit, code_path: &CodePaths) -> Result<(), String>;
}

/// Compiler running a command template once per matching source file
///
/// Placeholders: `{src}` source file, `{out_dir}` output directory,
/// `{stem}` file stem, `{name}` unit name. Values are shell-quoted on
/// substitution, so templates must leave placeholders unquoted.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    name: String,
    extensions: Vec<String>,
    command: String,
}

impl CommandCompiler {
    /// Create a command compiler
    pub fn new(name: impl Into<String>, extensions: Vec<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions,
            command: command.into(),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    fn sources(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && self.matches(e.path()))
            .map(walkdir::DirEntry::into_path)
            .collect();
        files.sort();
        files
    }

    fn render(&self, src: &Path, out_dir: &Path, unit: &Unit) -> String {
        let stem = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.command
            .replace("{src}", &process::shell_quote(&src.display().to_string()))
            .replace("{out_dir}", &process::shell_quote(&out_dir.display().to_string()))
            .replace("{stem}", &process::shell_quote(&stem))
            .replace("{name}", &process::shell_quote(&unit.name))
    }
}

impl Compiler for CommandCompiler {
    fn name(&self) -> &str {
        &self.name
    }

    fn compile(&self, unit: &Unit, code_path: &CodePaths) -> Result<(), String> {
        let mut env = unit_env(unit);
        env.push(("STAGECRAFT_CODE_PATH".to_string(), code_path.to_env_value()));

        // src_dirs compile into ebin, extra_src_dirs into themselves
        let targets = unit
            .options
            .src_dirs
            .iter()
            .map(|dir| (unit.output_dir.join(dir), unit.ebin_dir()))
            .chain(unit.options.extra_src_dirs.iter().map(|dir| {
                let path = unit.output_dir.join(dir);
                (path.clone(), path)
            }));

        for (src_dir, out_dir) in targets {
            if !src_dir.is_dir() {
                continue;
            }
            let sources = self.sources(&src_dir);
            if sources.is_empty() {
                continue;
            }
            filesystem::ensure_dir(&out_dir).map_err(|e| e.to_string())?;
            for src in sources {
                let command = self.render(&src, &out_dir, unit);
                process::run_shell(&command, &unit.output_dir, &env).map_err(|e| e.to_string())?;
            }
        }
        Ok(())
    }
}

/// Project builder running one command in the unit's workspace
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: String,
}

impl CommandBuilder {
    /// Create a command builder
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ProjectBuilder for CommandBuilder {
    fn build(&self, unit: &Unit, code_path: &CodePaths) -> Result<(), String> {
        filesystem::ensure_dir(&unit.output_dir.join(COMPILED_OUTPUT_DIR)).map_err(|e| e.to_string())?;
        let mut env = unit_env(unit);
        env.push(("STAGECRAFT_CODE_PATH".to_string(), code_path.to_env_value()));
        process::run_shell(&self.command, &unit.output_dir, &env).map_err(|e| e.to_string())
    }
}

/// Project builders keyed by project type tag
#[derive(Clone, Default)]
pub struct BuilderRegistry {
    builders: BTreeMap<String, Arc<dyn ProjectBuilder>>,
}

impl BuilderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `builder` for `tag`, replacing any earlier registration
    pub fn register(&mut self, tag: impl Into<String>, builder: impl ProjectBuilder + 'static) {
        self.builders.insert(tag.into(), Arc::new(builder));
    }

    /// Builder registered for `tag`
    pub fn lookup(&self, tag: &str) -> Option<Arc<dyn ProjectBuilder>> {
        self.builders.get(tag).cloned()
    }

    /// Whether a builder is registered for `tag`
    pub fn contains(&self, tag: &str) -> bool {
        self.builders.contains_key(tag)
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.builders.keys()).finish()
    }
}

/// Selects and runs the build strategy for a unit
#[derive(Clone, Default)]
pub struct Dispatcher {
    compilers: Vec<Arc<dyn Compiler>>,
    builders: BuilderRegistry,
}

impl Dispatcher {
    /// Create a dispatcher with no compilers and no builders
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a compiler to the default pipeline
    #[must_use]
    pub fn with_compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.compilers.push(Arc::new(compiler));
        self
    }

    /// Use `builders` as the project-builder registry
    #[must_use]
    pub fn with_builders(mut self, builders: BuilderRegistry) -> Self {
        self.builders = builders;
        self
    }

    /// Project-builder registry
    pub fn builders(&self) -> &BuilderRegistry {
        &self.builders
    }

    /// Fail unless a strategy exists for `unit`'s project type
    pub fn ensure_known(&self, unit: &Unit) -> Result<(), CompileError> {
        match &unit.project_type {
            ProjectType::Default => Ok(()),
            ProjectType::Custom(tag) if self.builders.contains(tag) => Ok(()),
            ProjectType::Custom(tag) => Err(CompileError::UnknownProjectType {
                unit: unit.name.clone(),
                project_type: tag.clone(),
            }),
        }
    }

    /// Build `unit` with the strategy its project type selects
    ///
    /// Custom builders run with the plugin scope active; the default scope is
    /// restored afterwards whatever the outcome.
    pub fn build(&self, unit: &Unit, code_path: &mut CodePaths) -> Result<(), CompileError> {
        match &unit.project_type {
            ProjectType::Default => self.compile_all(unit, code_path),
            ProjectType::Custom(tag) => {
                let builder = self.builders.lookup(tag).ok_or_else(|| {
                    CompileError::UnknownProjectType {
                        unit: unit.name.clone(),
                        project_type: tag.clone(),
                    }
                })?;
                tracing::info!("Building {} with project builder '{}'", unit.name, tag);
                let scoped = code_path.enter(PathScope::Plugins);
                builder
                    .build(unit, &scoped)
                    .map_err(|reason| CompileError::BuilderFailure {
                        unit: unit.name.clone(),
                        builder: tag.clone(),
                        reason,
                    })
            }
        }
    }

    /// Run every registered compiler, in order, against `unit`
    pub fn compile_all(&self, unit: &Unit, code_path: &CodePaths) -> Result<(), CompileError> {
        tracing::info!("Compiling {}", unit.name);
        for compiler in &self.compilers {
            tracing::debug!("Running compiler '{}' for {}", compiler.name(), unit.name);
            compiler
                .compile(unit, code_path)
                .map_err(|reason| CompileError::CompilerFailure {
                    unit: unit.name.clone(),
                    compiler: compiler.name().to_string(),
                    reason,
                })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compilers: Vec<&str> = self.compilers.iter().map(|c| c.name()).collect();
        f.debug_struct("Dispatcher")
            .field("compilers", &compilers)
            .field("builders", &self.builders)
            .finish()
    }
}
