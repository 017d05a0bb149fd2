//! Error types for stagecraft
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Manifest loading and normalisation errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest not found
    #[error("Manifest not found at '{path}'")]
    NotFound { path: PathBuf },

    /// IO error while reading a manifest
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// TOML syntax or schema error
    #[error("Failed to parse manifest: {source}")]
    Parse { source: toml::de::Error },

    /// Invalid manifest content
    #[error("Invalid manifest: {0}")]
    Invalid(String),

    /// `src_dirs` and `extra_src_dirs` share an entry
    #[error("Unit '{unit}' lists '{dir}' in both src_dirs and extra_src_dirs")]
    OverlappingSourceDirs { unit: String, dir: String },

    /// Source directory entry that is absolute or leaves the unit
    #[error("Unit '{unit}' lists source directory '{dir}' outside the unit")]
    InvalidSourceDir { unit: String, dir: String },

    /// Hook declaration with an unknown stage or phase
    #[error("Invalid hook in '{owner}': {message}")]
    InvalidHook { owner: String, message: String },
}

/// Dependency resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove a file, link or directory
    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    /// Failed to copy
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to create a symbolic link
    #[error("Failed to link '{link}' -> '{target}': {error}")]
    Link {
        target: PathBuf,
        link: PathBuf,
        error: String,
    },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// External command errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// The shell could not be spawned
    #[error("Failed to run '{command}': {error}")]
    Spawn { command: String, error: String },

    /// The command exited unsuccessfully
    #[error("Command '{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Hook execution errors
#[derive(Error, Debug)]
pub enum HookError {
    /// A hook reported failure
    #[error("{phase}-{stage} hook '{hook}' failed: {reason}")]
    Failed {
        hook: String,
        stage: String,
        phase: String,
        reason: String,
    },
}

/// Application resource finalization errors
#[derive(Error, Debug)]
pub enum FinalizeError {
    /// The `.app.src` file could not be parsed
    #[error("Invalid application resource '{path}' for '{unit}': {error}")]
    InvalidResource {
        unit: String,
        path: PathBuf,
        error: String,
    },

    /// The `.app.src` file names a different application
    #[error("Application resource '{path}' names '{found}', expected '{unit}'")]
    NameMismatch {
        unit: String,
        found: String,
        path: PathBuf,
    },

    /// Writing the resource file failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Fatal compile-run errors
///
/// Every variant aborts the whole run.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Build order could not be computed
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// No project builder registered for a unit's type
    #[error("Unknown project type '{project_type}' for application '{unit}'")]
    UnknownProjectType { unit: String, project_type: String },

    /// A custom project builder returned an error
    #[error("Error building application '{unit}' with builder '{builder}': {reason}")]
    BuilderFailure {
        unit: String,
        builder: String,
        reason: String,
    },

    /// A compiler of the default pipeline returned an error
    #[error("Compiler '{compiler}' failed for application '{unit}': {reason}")]
    CompilerFailure {
        unit: String,
        compiler: String,
        reason: String,
    },

    /// A declared artifact is absent after the build
    #[error("Missing artifact {}", path.display())]
    MissingArtifact { path: PathBuf },

    /// The metadata-finalization step failed
    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    /// A hook failed
    #[error("Application '{unit}': {error}")]
    Hook { unit: String, error: HookError },

    /// Staging a unit's workspace failed
    #[error("Failed to stage application '{unit}': {error}")]
    Stage {
        unit: String,
        error: FilesystemError,
    },

    /// Preparing the extra-directories build failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl CompileError {
    /// Attach the unit name to a hook failure
    pub fn hook(unit: impl Into<String>, error: HookError) -> Self {
        Self::Hook {
            unit: unit.into(),
            error,
        }
    }

    /// Attach the unit name to a staging failure
    pub fn stage(unit: impl Into<String>, error: FilesystemError) -> Self {
        Self::Stage {
            unit: unit.into(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_names_file() {
        let err = CompileError::MissingArtifact {
            path: PathBuf::from("/w/base/ebin/base.app"),
        };
        assert_eq!(err.to_string(), "Missing artifact /w/base/ebin/base.app");
    }

    #[test]
    fn test_unknown_project_type_names_unit_and_type() {
        let err = CompileError::UnknownProjectType {
            unit: "plugin".to_string(),
            project_type: "custom".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("plugin"));
        assert!(msg.contains("custom"));
    }

    #[test]
    fn test_builder_failure_names_unit_builder_and_reason() {
        let err = CompileError::BuilderFailure {
            unit: "api".to_string(),
            builder: "make".to_string(),
            reason: "exit 2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("api") && msg.contains("make") && msg.contains("exit 2"));
    }

    #[test]
    fn test_finalize_reason_is_unchanged() {
        let inner = FinalizeError::NameMismatch {
            unit: "a".to_string(),
            found: "b".to_string(),
            path: PathBuf::from("src/a.app.src"),
        };
        let expected = inner.to_string();
        let err = CompileError::from(inner);
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_hook_failure_is_reported_once() {
        let err = CompileError::hook(
            "base",
            HookError::Failed {
                hook: "exit 3".to_string(),
                stage: "unit_compile".to_string(),
                phase: "pre".to_string(),
                reason: "exit status 3".to_string(),
            },
        );
        let mut chain = vec![err.to_string()];
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        let rendered = chain.join("\n");
        assert_eq!(rendered.matches("pre-unit_compile hook 'exit 3' failed").count(), 1);
        assert!(rendered.contains("Application 'base'"));
    }

    #[test]
    fn test_stage_failure_names_unit_and_path() {
        let err = CompileError::stage(
            "api",
            FilesystemError::CreateDir {
                path: PathBuf::from("/w/lib/api"),
                error: "Not a directory".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "Failed to stage application 'api': Failed to create directory '/w/lib/api': Not a directory"
        );
    }

    #[test]
    fn test_cycle_lists_path() {
        let err = CompileError::from(ResolverError::CircularDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        });
        assert!(matches!(err, CompileError::Resolver(_)));
        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> a");
    }
}
