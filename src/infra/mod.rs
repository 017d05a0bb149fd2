//! Infrastructure layer
//!
//! Handles I/O operations: filesystem and external processes.

pub mod filesystem;
pub mod process;
