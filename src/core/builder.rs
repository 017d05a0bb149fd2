//! Build orchestration logic
//!
//! Coordinates a compile run across dependency units, project units and
//! top-level extra directories, and assembles the resulting code path.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::defaults::{DEFAULT_BUILD_JOBS, DEFAULT_PROFILE, EXTRAS_DIR};
use crate::core::code_path::{self, CodePaths};
use crate::core::dispatch::Dispatcher;
use crate::core::extras;
use crate::core::finalize::{AppResourceFinalizer, Finalizer};
use crate::core::hooks::{HookContext, HookRegistry, Phase, Stage};
use crate::core::resolver;
use crate::core::stage::Stager;
use crate::core::unit::Unit;
use crate::core::verify;
use crate::error::CompileError;
use crate::infra::filesystem::LinkMode;

/// Outcome of a successful compile run
#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
    /// Profile the run was built under
    pub profile: String,
    /// Whether only dependency units were built
    pub deps_only: bool,
    /// Dependency units, in build order
    pub dependencies: Vec<String>,
    /// Project units, in build order
    pub units: Vec<String>,
    /// Top-level extra directories that were built
    pub extras: Vec<String>,
    /// Final code-path context
    pub code_paths: CodePaths,
    /// Global code path
    pub global_path: Vec<PathBuf>,
}

/// Build orchestrator state
pub struct BuildOrchestrator {
    root: PathBuf,
    build_area: PathBuf,
    profile: String,
    dependencies: Vec<Unit>,
    units: Vec<Unit>,
    extra_dirs: Vec<String>,
    dispatcher: Dispatcher,
    hooks: HookRegistry,
    finalizer: Arc<dyn Finalizer>,
    link_mode: Option<LinkMode>,
    plugin_paths: Vec<PathBuf>,
    jobs: usize,
    deps_only: bool,
}

impl BuildOrchestrator {
    /// Create an orchestrator for the project at `root`, building into
    /// `build_area` (the profile directory of the build area)
    pub fn new(root: impl Into<PathBuf>, build_area: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            build_area: build_area.into(),
            profile: DEFAULT_PROFILE.to_string(),
            dependencies: Vec::new(),
            units: Vec::new(),
            extra_dirs: Vec::new(),
            dispatcher: Dispatcher::new(),
            hooks: HookRegistry::new(),
            finalizer: Arc::new(AppResourceFinalizer),
            link_mode: None,
            plugin_paths: Vec::new(),
            jobs: DEFAULT_BUILD_JOBS,
            deps_only: false,
        }
    }

    /// Set the profile name
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the project units
    #[must_use]
    pub fn with_units(mut self, units: Vec<Unit>) -> Self {
        self.units = units;
        self
    }

    /// Set the dependency units
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<Unit>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Set the top-level extra source directories
    #[must_use]
    pub fn with_extra_dirs(mut self, dirs: Vec<String>) -> Self {
        self.extra_dirs = dirs;
        self
    }

    /// Set the builder dispatcher
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Set the project-level hooks
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the finalize step
    #[must_use]
    pub fn with_finalizer(mut self, finalizer: impl Finalizer + 'static) -> Self {
        self.finalizer = Arc::new(finalizer);
        self
    }

    /// Force a link capability instead of probing for one
    #[must_use]
    pub fn with_link_mode(mut self, mode: LinkMode) -> Self {
        self.link_mode = Some(mode);
        self
    }

    /// Paths made visible to custom project builders
    #[must_use]
    pub fn with_plugin_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.plugin_paths = paths;
        self
    }

    /// Set the number of parallel jobs
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Only build dependency units
    #[must_use]
    pub fn deps_only(mut self, deps_only: bool) -> Self {
        self.deps_only = deps_only;
        self
    }

    /// Run the compile, threading `code_path` through and returning it in
    /// the report
    pub fn run(&self, mut code_path: CodePaths) -> Result<CompileReport, CompileError> {
        let mode = self
            .link_mode
            .unwrap_or_else(|| LinkMode::probe(&self.build_area));
        let stager = Stager::new(mode);
        code_path.set_plugins(self.plugin_paths.clone());

        let dependencies = self.build_dependencies(&stager, &mut code_path)?;
        let mut report = CompileReport {
            profile: self.profile.clone(),
            deps_only: self.deps_only,
            dependencies: dependencies.iter().map(|u| u.name.clone()).collect(),
            units: Vec::new(),
            extras: Vec::new(),
            code_paths: CodePaths::default(),
            global_path: Vec::new(),
        };
        if self.deps_only {
            tracing::info!("Dependencies built, skipping project units");
            report.global_path = code_path.global();
            report.code_paths = code_path;
            return Ok(report);
        }

        let ordered = resolver::order_units(self.units.clone())?;
        for unit in &ordered {
            self.dispatcher.ensure_known(unit)?;
        }
        tracing::info!(
            "Build order: {}",
            ordered
                .iter()
                .map(|u| u.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let ordered = self
            .hooks
            .run_all(&self.project_context(Phase::Pre), ordered)
            .map_err(|e| CompileError::hook(self.project_label(), e))?;

        for unit in &ordered {
            stager
                .stage(unit)
                .map_err(|e| CompileError::stage(&unit.name, e))?;
        }

        let built = if self.jobs > 1 {
            self.build_parallel(ordered, &code_path)?
        } else {
            self.build_sequential(ordered, &mut code_path)?
        };

        let extras_dir = self.build_area.join(EXTRAS_DIR);
        if extras::should_build(&self.root, &built) {
            report.extras = extras::build_extra_dirs(
                &self.root,
                &extras_dir,
                &self.extra_dirs,
                &self.dispatcher,
                &code_path,
            )?;
        } else {
            tracing::debug!("Project root is a unit, skipping top-level extra directories");
        }

        code_path.set_project_apps(code_path::project_app_paths(&built));
        code_path.set_extras(code_path::extra_paths(&extras_dir, &report.extras));

        let built = self
            .hooks
            .run_all(&self.project_context(Phase::Post), built)
            .map_err(|e| CompileError::hook(self.project_label(), e))?;

        verify::verify_all(&built)?;

        report.units = built.iter().map(|u| u.name.clone()).collect();
        report.global_path = code_path.global();
        report.code_paths = code_path;
        Ok(report)
    }

    fn project_context(&self, phase: Phase) -> HookContext<'_> {
        HookContext {
            dir: &self.root,
            stage: Stage::Compile,
            phase,
            profile: &self.profile,
        }
    }

    fn project_label(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    /// Stage, dispatch and finalize dependency units without hooks
    fn build_dependencies(
        &self,
        stager: &Stager,
        code_path: &mut CodePaths,
    ) -> Result<Vec<Unit>, CompileError> {
        if self.dependencies.is_empty() {
            return Ok(Vec::new());
        }
        let ordered = resolver::order_units(self.dependencies.clone())?;
        let mut built = Vec::with_capacity(ordered.len());
        for unit in ordered {
            tracing::info!("Building dependency {}", unit.name);
            stager
                .stage(&unit)
                .map_err(|e| CompileError::stage(&unit.name, e))?;
            self.dispatcher.build(&unit, code_path)?;
            let unit = self.finalizer.finalize(&self.profile, unit)?;
            verify::verify(&unit)?;
            built.push(unit);
        }
        code_path.set_deps(built.iter().map(Unit::ebin_dir).collect());
        Ok(built)
    }

    fn build_sequential(
        &self,
        ordered: Vec<Unit>,
        code_path: &mut CodePaths,
    ) -> Result<Vec<Unit>, CompileError> {
        ordered
            .into_iter()
            .map(|unit| self.compile_unit(unit, code_path))
            .collect()
    }

    /// Build independent units concurrently, one dependency level at a time
    ///
    /// After a failure no new unit starts; running units finish and the first
    /// error in build order is returned.
    fn build_parallel(
        &self,
        ordered: Vec<Unit>,
        code_path: &CodePaths,
    ) -> Result<Vec<Unit>, CompileError> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!("Could not start worker pool ({e}), building sequentially");
                let mut code_path = code_path.clone();
                return self.build_sequential(ordered, &mut code_path);
            }
        };

        tracing::info!("Building with {} jobs", self.jobs);
        let failed = AtomicBool::new(false);
        let mut built = Vec::new();
        for level in resolver::unit_levels(ordered)? {
            let results: Vec<Option<Result<Unit, CompileError>>> = pool.install(|| {
                level
                    .into_par_iter()
                    .map(|unit| {
                        if failed.load(Ordering::SeqCst) {
                            tracing::debug!("Not starting {} after failure", unit.name);
                            return None;
                        }
                        let mut local = code_path.clone();
                        let result = self.compile_unit(unit, &mut local);
                        if result.is_err() {
                            failed.store(true, Ordering::SeqCst);
                        }
                        Some(result)
                    })
                    .collect()
            });

            for result in results.into_iter().flatten() {
                built.push(result?);
            }
        }
        Ok(built)
    }

    /// Run the hook-wrapped compile sequence for one unit
    fn compile_unit(&self, unit: Unit, code_path: &mut CodePaths) -> Result<Unit, CompileError> {
        let name = unit.name.clone();
        let hooks = unit.hooks.clone();
        let dir = unit.source_dir.clone();
        let run_hooks = |stage: Stage, phase: Phase, unit: Unit| {
            let ctx = HookContext {
                dir: &dir,
                stage,
                phase,
                profile: &self.profile,
            };
            hooks
                .run(&ctx, unit)
                .map_err(|e| CompileError::hook(name.clone(), e))
        };

        let unit = run_hooks(Stage::Compile, Phase::Pre, unit)?;
        let unit = run_hooks(Stage::UnitCompile, Phase::Pre, unit)?;
        self.dispatcher.build(&unit, code_path)?;
        let unit = run_hooks(Stage::UnitCompile, Phase::Post, unit)?;
        let unit = run_hooks(Stage::AppCompile, Phase::Pre, unit)?;
        let unit = self.finalizer.finalize(&self.profile, unit)?;
        let unit = run_hooks(Stage::AppCompile, Phase::Post, unit)?;
        let unit = run_hooks(Stage::Compile, Phase::Post, unit)?;
        verify::verify(&unit)?;
        tracing::info!("Compiled {}", unit.name);
        Ok(unit)
    }
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("root", &self.root)
            .field("build_area", &self.build_area)
            .field("profile", &self.profile)
            .field("units", &self.units.iter().map(|u| &u.name).collect::<Vec<_>>())
            .field("jobs", &self.jobs)
            .field("deps_only", &self.deps_only)
            .finish_non_exhaustive()
    }
}
