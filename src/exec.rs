//! Shell-exec collaborator.
//!
//! Runs a single command through the configured shell with a hard timeout.
//! Only reachable when `exec.enabled` is set.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::ExecConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecRequest {
    pub command: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub success: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Command execution is disabled")]
    Disabled,
    #[error("Command must not be empty")]
    EmptyCommand,
    #[error("Failed to start command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Command timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Clone)]
pub struct CommandRunner {
    shell: String,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(shell: impl Into<String>, timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }

    /// Runner for the given config, or `None` when exec is disabled.
    pub fn from_config(config: &ExecConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.shell.clone(), Duration::from_secs(config.timeout_secs)))
    }

    pub async fn run(&self, request: &ExecRequest) -> Result<ExecOutput, ExecError> {
        let command = request.command.trim();
        if command.is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = request.cwd {
            cmd.current_dir(cwd);
        }

        let start = Instant::now();
        let child = cmd.spawn()?;

        // Dropping the wait future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Command timed out, killed");
                return Err(ExecError::Timeout(self.timeout.as_secs()));
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        info!(
            exit_code,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Command completed"
        );

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
            success: output.status.success(),
        })
    }
}
