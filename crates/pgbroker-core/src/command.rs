// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bounded execution of external CLI tools (docker, iptables).

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be spawned.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("{program} timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Program name.
        program: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
    /// Standard output (lossy UTF-8).
    pub stdout: String,
    /// Standard error (lossy UTF-8).
    pub stderr: String,
}

/// Read a duration in whole seconds from an env var.
pub(crate) fn env_secs(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Read an env var, falling back to `default`.
pub(crate) fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

/// Run `program args...` and wait for it, killing it if `timeout` elapses.
pub async fn run_command(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    debug!(program, args = ?args, "Running command");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(CommandError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    Ok(CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
