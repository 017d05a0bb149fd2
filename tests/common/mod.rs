//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a project with `manifest` as its stagecraft.toml
    pub fn with_manifest(manifest: &str) -> Self {
        let project = Self::new();
        project.create_file("stagecraft.toml", manifest);
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Workspace of `unit` under the default profile
    pub fn unit_dir(&self, unit: &str) -> PathBuf {
        self.profile_dir("default").join("lib").join(unit)
    }

    /// Build area of `profile`
    pub fn profile_dir(&self, profile: &str) -> PathBuf {
        self.dir.path().join("_build").join(profile)
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run the stagecraft binary in the project directory
    pub fn run(&self, args: &[&str]) -> Output {
        run_in(self.dir.path(), args)
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the stagecraft binary in `dir`
pub fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stagecraft"))
        .current_dir(dir)
        .args(args)
        .env_remove("STAGECRAFT_PROFILE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute stagecraft")
}

/// Two units: `api` depends on `base`; both declare `ebin/<name>.app`
pub const TWO_UNIT_MANIFEST: &str = r#"
[project]
name = "demo"

[units.base]
path = "apps/base"
artifacts = ["ebin/{name}.app"]

[units.api]
path = "apps/api"
deps = ["base"]
artifacts = ["ebin/{name}.app"]
"#;

/// Default compiler copying `.src` files to `ebin/<stem>.beam`
pub const COPY_COMPILER: &str = r#"
[[compilers]]
name = "copy"
extensions = ["src"]
command = "cp {src} {out_dir}/{stem}.beam"
"#;
