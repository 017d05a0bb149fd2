//! Hook registry and runner
//!
//! Hooks are user-registered callables invoked before (`pre`) and after
//! (`post`) each build stage. Within a `(stage, phase)` key hooks run in
//! registration order and each receives the unit returned by the previous one.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::unit::Unit;
use crate::error::HookError;
use crate::infra::process;

/// Build stage a hook is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// The overall compile stage
    Compile,
    /// The low-level compile stage (builder dispatch)
    UnitCompile,
    /// Application metadata finalization
    AppCompile,
}

impl Stage {
    /// Tag used in manifests and environment variables
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::UnitCompile => "unit_compile",
            Self::AppCompile => "app_compile",
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compile" => Ok(Self::Compile),
            "unit_compile" => Ok(Self::UnitCompile),
            "app_compile" => Ok(Self::AppCompile),
            other => Err(format!(
                "unknown stage '{other}' (expected compile, unit_compile or app_compile)"
            )),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Before the stage
    Pre,
    /// After the stage
    Post,
}

impl Phase {
    /// Tag used in manifests and environment variables
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            other => Err(format!("unknown phase '{other}' (expected pre or post)")),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and when a hook runs
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Working directory for the hook
    pub dir: &'a Path,
    /// Stage being wrapped
    pub stage: Stage,
    /// Phase within the stage
    pub phase: Phase,
    /// Active build profile
    pub profile: &'a str,
}

impl HookContext<'_> {
    /// Environment exported to external hook commands
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            ("STAGECRAFT_HOOK_STAGE".to_string(), self.stage.to_string()),
            ("STAGECRAFT_HOOK_PHASE".to_string(), self.phase.to_string()),
            ("STAGECRAFT_PROFILE".to_string(), self.profile.to_string()),
        ]
    }
}

/// A hook callable
pub trait Hook: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Apply the hook to one unit, returning the unit to thread onward
    fn apply(&self, ctx: &HookContext<'_>, unit: Unit) -> Result<Unit, String>;

    /// Apply the hook once for a whole unit set (project-level hooks)
    fn apply_all(&self, ctx: &HookContext<'_>, units: Vec<Unit>) -> Result<Vec<Unit>, String> {
        units.into_iter().map(|unit| self.apply(ctx, unit)).collect()
    }
}

/// Hook running a shell command
#[derive(Debug, Clone)]
pub struct ShellHook {
    command: String,
}

impl ShellHook {
    /// Create a shell hook
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Hook for ShellHook {
    fn name(&self) -> &str {
        &self.command
    }

    fn apply(&self, ctx: &HookContext<'_>, unit: Unit) -> Result<Unit, String> {
        let mut env = ctx.env();
        env.extend(unit_env(&unit));
        process::run_shell(&self.command, ctx.dir, &env).map_err(|e| e.to_string())?;
        Ok(unit)
    }

    fn apply_all(&self, ctx: &HookContext<'_>, units: Vec<Unit>) -> Result<Vec<Unit>, String> {
        process::run_shell(&self.command, ctx.dir, &ctx.env()).map_err(|e| e.to_string())?;
        Ok(units)
    }
}

/// Environment describing a unit to external commands
pub fn unit_env(unit: &Unit) -> Vec<(String, String)> {
    vec![
        ("STAGECRAFT_UNIT".to_string(), unit.name.clone()),
        ("STAGECRAFT_UNIT_VERSION".to_string(), unit.version.clone()),
        (
            "STAGECRAFT_SOURCE_DIR".to_string(),
            unit.source_dir.display().to_string(),
        ),
        (
            "STAGECRAFT_OUTPUT_DIR".to_string(),
            unit.output_dir.display().to_string(),
        ),
    ]
}

/// Hook backed by a closure
pub struct FnHook<F> {
    name: String,
    func: F,
}

impl<F> FnHook<F>
where
    F: Fn(&HookContext<'_>, Unit) -> Result<Unit, String> + Send + Sync,
{
    /// Create a closure hook
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Hook for FnHook<F>
where
    F: Fn(&HookContext<'_>, Unit) -> Result<Unit, String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &HookContext<'_>, unit: Unit) -> Result<Unit, String> {
        (self.func)(ctx, unit)
    }
}

/// Ordered hooks keyed by `(stage, phase)`
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: BTreeMap<(Stage, Phase), Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to the `(stage, phase)` list
    pub fn register(&mut self, stage: Stage, phase: Phase, hook: impl Hook + 'static) {
        self.register_arc(stage, phase, Arc::new(hook));
    }

    /// Append a shared hook to the `(stage, phase)` list
    pub fn register_arc(&mut self, stage: Stage, phase: Phase, hook: Arc<dyn Hook>) {
        self.hooks.entry((stage, phase)).or_default().push(hook);
    }

    /// Hooks registered for `(stage, phase)`, in registration order
    pub fn hooks_for(&self, stage: Stage, phase: Phase) -> &[Arc<dyn Hook>] {
        self.hooks
            .get(&(stage, phase))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Total number of registered hooks
    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// Whether no hook is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the hooks for `ctx` against one unit
    pub fn run(&self, ctx: &HookContext<'_>, mut unit: Unit) -> Result<Unit, HookError> {
        for hook in self.hooks_for(ctx.stage, ctx.phase) {
            tracing::debug!(
                "Running {}-{} hook '{}' for {}",
                ctx.phase,
                ctx.stage,
                hook.name(),
                unit.name
            );
            unit = hook
                .apply(ctx, unit)
                .map_err(|reason| failed(hook.as_ref(), ctx, reason))?;
        }
        Ok(unit)
    }

    /// Run the hooks for `ctx` once against a whole unit set
    pub fn run_all(&self, ctx: &HookContext<'_>, mut units: Vec<Unit>) -> Result<Vec<Unit>, HookError> {
        for hook in self.hooks_for(ctx.stage, ctx.phase) {
            tracing::debug!(
                "Running project {}-{} hook '{}'",
                ctx.phase,
                ctx.stage,
                hook.name()
            );
            units = hook
                .apply_all(ctx, units)
                .map_err(|reason| failed(hook.as_ref(), ctx, reason))?;
        }
        Ok(units)
    }
}

fn failed(hook: &dyn Hook, ctx: &HookContext<'_>, reason: String) -> HookError {
    HookError::Failed {
        hook: hook.name().to_string(),
        stage: ctx.stage.to_string(),
        phase: ctx.phase.to_string(),
        reason,
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for ((stage, phase), hooks) in &self.hooks {
            let names: Vec<&str> = hooks.iter().map(|h| h.name()).collect();
            map.entry(&format!("{phase}-{stage}"), &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx(stage: Stage, phase: Phase) -> HookContext<'static> {
        HookContext {
            dir: Path::new("."),
            stage,
            phase,
            profile: "default",
        }
    }

    fn tagging_hook(tag: &'static str) -> FnHook<impl Fn(&HookContext<'_>, Unit) -> Result<Unit, String>> {
        FnHook::new(tag, move |_, mut unit: Unit| {
            unit.artifacts.push(tag.to_string());
            Ok(unit)
        })
    }

    #[test]
    fn test_stage_and_phase_parse() {
        assert_eq!("unit_compile".parse::<Stage>(), Ok(Stage::UnitCompile));
        assert_eq!("post".parse::<Phase>(), Ok(Phase::Post));
        assert!("link".parse::<Stage>().is_err());
        assert!("during".parse::<Phase>().is_err());
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let mut registry = HookRegistry::new();
        registry.register(Stage::Compile, Phase::Pre, tagging_hook("first"));
        registry.register(Stage::Compile, Phase::Pre, tagging_hook("second"));
        registry.register(Stage::Compile, Phase::Post, tagging_hook("other"));

        let unit = Unit::new("a", PathBuf::from("/s"), PathBuf::from("/o"));
        let unit = registry.run(&ctx(Stage::Compile, Phase::Pre), unit).unwrap();

        assert_eq!(unit.artifacts, vec!["first", "second"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_hook_failure_names_hook_and_stage() {
        let mut registry = HookRegistry::new();
        registry.register(
            Stage::AppCompile,
            Phase::Post,
            FnHook::new("broken", |_, _| Err("boom".to_string())),
        );

        let unit = Unit::new("a", PathBuf::from("/s"), PathBuf::from("/o"));
        let err = registry
            .run(&ctx(Stage::AppCompile, Phase::Post), unit)
            .unwrap_err();

        assert_eq!(err.to_string(), "post-app_compile hook 'broken' failed: boom");
    }

    #[test]
    fn test_empty_registry_passes_unit_through() {
        let registry = HookRegistry::new();
        let unit = Unit::new("a", PathBuf::from("/s"), PathBuf::from("/o"));
        let unit = registry.run(&ctx(Stage::Compile, Phase::Pre), unit).unwrap();
        assert_eq!(unit.name, "a");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_run_all_threads_units() {
        let mut registry = HookRegistry::new();
        registry.register(Stage::Compile, Phase::Post, tagging_hook("seen"));

        let units = vec![
            Unit::new("a", PathBuf::from("/a"), PathBuf::from("/oa")),
            Unit::new("b", PathBuf::from("/b"), PathBuf::from("/ob")),
        ];
        let units = registry
            .run_all(&ctx(Stage::Compile, Phase::Post), units)
            .unwrap();

        assert!(units.iter().all(|u| u.artifacts == vec!["seen"]));
    }
}
