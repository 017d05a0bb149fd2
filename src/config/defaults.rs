//! Default configuration values and workspace layout conventions

/// Manifest file name at the project root
pub const MANIFEST_FILE: &str = "stagecraft.toml";

/// Internal build area, relative to the project root
pub const DEFAULT_BUILD_DIR: &str = "_build";

/// Profile used when none is requested
pub const DEFAULT_PROFILE: &str = "default";

/// Source directories used when a unit declares none
pub const DEFAULT_SRC_DIRS: &[&str] = &["src"];

/// Compiled-output directory inside a unit workspace
pub const COMPILED_OUTPUT_DIR: &str = "ebin";

/// Runtime resource and header directories, always linked into the workspace
pub const LINKED_DIRS: &[&str] = &["priv", "include"];

/// Platform resource-compilation directory, linked when present
pub const RESOURCE_SRC_DIR: &str = "mibs";

/// Companion output directory for compiled resources
pub const RESOURCE_OUTPUT_DIR: &str = "priv/mibs";

/// Directory names claimed by test runners
pub const RESERVED_DIR_NAMES: &[&str] = &["eunit", "ct"];

/// Sub-directory of a profile holding unit workspaces
pub const LIB_DIR: &str = "lib";

/// Sub-directory of a profile holding top-level extra directories
pub const EXTRAS_DIR: &str = "extras";

/// Suffix of an application resource source file
pub const APP_SRC_SUFFIX: &str = ".app.src";

/// Suffix of a generated application resource file
pub const APP_SUFFIX: &str = ".app";

/// Default unit version
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Default number of parallel build jobs
pub const DEFAULT_BUILD_JOBS: usize = 1;

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
