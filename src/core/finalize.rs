//! Application metadata finalization
//!
//! Produces the unit's application resource, `ebin/<name>.app`, from an
//! optional `<name>.app.src` (TOML) found in one of its source directories.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::defaults::{APP_SRC_SUFFIX, APP_SUFFIX};
use crate::core::unit::Unit;
use crate::error::{FilesystemError, FinalizeError};
use crate::infra::filesystem;

/// The finalize step of the compile sequence
pub trait Finalizer: Send + Sync {
    /// Finalize `unit` under `profile`, returning the updated unit
    fn finalize(&self, profile: &str, unit: Unit) -> Result<Unit, FinalizeError>;
}

/// Application resource source (`<name>.app.src`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSource {
    /// Application name; must match the unit when present
    pub name: Option<String>,
    /// Version; overrides the unit version when present
    pub vsn: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Runtime applications; defaults to the unit's dependencies
    pub applications: Option<Vec<String>>,
    /// Application environment
    #[serde(default)]
    pub env: BTreeMap<String, toml::Value>,
}

/// Generated application resource (`<name>.app`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppResource {
    /// Application name
    pub name: String,
    /// Version
    pub vsn: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Compiled modules found in `ebin/`
    pub modules: Vec<String>,
    /// Runtime applications
    pub applications: Vec<String>,
    /// Profile the resource was generated under
    pub profile: String,
    /// Application environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, toml::Value>,
}

/// Writes `ebin/<name>.app`
#[derive(Debug, Clone, Copy, Default)]
pub struct AppResourceFinalizer;

impl AppResourceFinalizer {
    fn find_source(unit: &Unit) -> Option<PathBuf> {
        let file = format!("{}{APP_SRC_SUFFIX}", unit.name);
        unit.options
            .src_dirs
            .iter()
            .map(|dir| unit.output_dir.join(dir).join(&file))
            .find(|path| path.is_file())
    }

    fn load_source(unit: &Unit) -> Result<AppSource, FinalizeError> {
        let Some(path) = Self::find_source(unit) else {
            return Ok(AppSource::default());
        };
        let content = filesystem::read_file(&path)?;
        let source: AppSource =
            toml::from_str(&content).map_err(|e| FinalizeError::InvalidResource {
                unit: unit.name.clone(),
                path: path.clone(),
                error: e.to_string(),
            })?;
        if let Some(found) = &source.name {
            if found != &unit.name {
                return Err(FinalizeError::NameMismatch {
                    unit: unit.name.clone(),
                    found: found.clone(),
                    path,
                });
            }
        }
        Ok(source)
    }

    fn modules(unit: &Unit) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(unit.ebin_dir()) else {
            return Vec::new();
        };
        let mut modules: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && !p.to_string_lossy().ends_with(APP_SUFFIX))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        modules.sort();
        modules.dedup();
        modules
    }
}

impl Finalizer for AppResourceFinalizer {
    fn finalize(&self, profile: &str, mut unit: Unit) -> Result<Unit, FinalizeError> {
        let source = Self::load_source(&unit)?;
        if let Some(vsn) = source.vsn {
            unit.version = vsn;
        }

        let resource = AppResource {
            name: unit.name.clone(),
            vsn: unit.version.clone(),
            description: source.description,
            modules: Self::modules(&unit),
            applications: source.applications.unwrap_or_else(|| unit.deps.clone()),
            profile: profile.to_string(),
            env: source.env,
        };

        let path = unit.ebin_dir().join(format!("{}{APP_SUFFIX}", unit.name));
        let content = serde_json::to_string_pretty(&resource).map_err(|e| {
            FinalizeError::Filesystem(FilesystemError::WriteFile {
                path: path.clone(),
                error: e.to_string(),
            })
        })?;
        filesystem::ensure_dir(&unit.ebin_dir())?;
        filesystem::write_file(&path, &content)?;
        tracing::debug!("Wrote application resource {}", path.display());

        Ok(unit)
    }
}
