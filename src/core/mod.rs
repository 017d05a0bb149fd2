//! Core business logic module
//!
//! This module contains the build orchestration logic for stagecraft.
//! Filesystem and process primitives live in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`manifest`] - Manifest (stagecraft.toml) parsing and validation
//! - [`unit`] - Unit descriptors and their options
//! - [`resolver`] - Build-order resolution
//! - [`hooks`] - Hook registry and runner
//! - [`stage`] - Source tree staging
//! - [`dispatch`] - Builder dispatch and the default compiler pipeline
//! - [`finalize`] - Application resource generation
//! - [`verify`] - Artifact verification
//! - [`code_path`] - Code-path context
//! - [`extras`] - Top-level extra directories
//! - [`builder`] - Build orchestration logic
//! - [`check`] - Configuration validation logic
//! - [`clean`] - Clean build output logic

pub mod builder;
pub mod check;
pub mod clean;
pub mod code_path;
pub mod dispatch;
pub mod extras;
pub mod finalize;
pub mod hooks;
pub mod manifest;
pub mod resolver;
pub mod stage;
pub mod unit;
pub mod verify;
