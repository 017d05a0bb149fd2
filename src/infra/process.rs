//! External process execution
//!
//! Hooks, command compilers and command builders all run through the
//! platform shell.

use std::path::Path;
use std::process::Command;

use crate::error::ProcessError;

/// Run `command` through the platform shell in `cwd`
///
/// Standard output is forwarded to the debug log; a non-zero exit status is
/// returned as [`ProcessError::Failed`] carrying the trimmed standard error.
pub fn run_shell(command: &str, cwd: &Path, env: &[(String, String)]) -> Result<(), ProcessError> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };
    cmd.current_dir(cwd);
    for (key, value) in env {
        cmd.env(key, value);
    }

    tracing::debug!("Running '{}' in {}", command, cwd.display());
    let output = cmd.output().map_err(|e| ProcessError::Spawn {
        command: command.to_string(),
        error: e.to_string(),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        tracing::debug!("{}", stdout.trim_end());
    }

    if output.status.success() {
        Ok(())
    } else {
        Err(ProcessError::Failed {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Quote `value` as a single word of a shell command line
///
/// Plain words are returned unchanged.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@%".contains(c));
    if plain {
        value.to_string()
    } else if cfg!(target_os = "windows") {
        format!("\"{value}\"")
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Program name of a shell command line (its first word)
pub fn program_name(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}

/// Whether the program of `command` can be found on `PATH`
pub fn program_available(command: &str) -> bool {
    program_name(command).is_some_and(|program| which::which(program).is_ok())
}
