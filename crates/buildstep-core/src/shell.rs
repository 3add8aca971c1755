//! Subprocess execution for build steps.

use crate::error::{Result, StepError};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{info, warn};

/// A single external command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command to execute (first element is executable).
    pub argv: Vec<String>,

    /// Environment overrides applied to this invocation only.
    pub env: Vec<(String, String)>,

    /// Working directory, inherited when unset.
    pub cwd: Option<PathBuf>,

    /// Timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,
}

impl CommandSpec {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            ..Self::default()
        }
    }

    /// Set an environment variable for the spawned process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Shell-style rendering for logs and error messages.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Result of a completed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

/// Run a command to completion.
///
/// A non-zero exit status is returned as [`StepError::CommandFailed`], so
/// callers only see `Ok` for commands that succeeded.
pub async fn run_command(spec: &CommandSpec) -> Result<CommandOutput> {
    let start = Instant::now();

    let (exe, args) = spec
        .argv
        .split_first()
        .ok_or_else(|| StepError::InvalidConfig("empty command".to_string()))?;

    let command_line = spec.display();
    info!(command = %command_line, "Running command");

    let mut command = Command::new(exe);
    command
        .args(args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    let child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StepError::CommandNotFound(exe.clone())
        } else {
            StepError::Io(e)
        }
    })?;

    let output = if spec.timeout_secs > 0 {
        tokio::time::timeout(
            Duration::from_secs(spec.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| StepError::CommandTimedOut {
            command: command_line.clone(),
            timeout_secs: spec.timeout_secs,
        })??
    } else {
        child.wait_with_output().await?
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    for line in stdout.lines() {
        info!("{}", line);
    }
    for line in stderr.lines() {
        warn!("{}", line);
    }

    if !output.status.success() {
        return Err(StepError::CommandFailed {
            command: command_line,
            exit_code,
            stderr,
        });
    }

    info!(duration_ms, "Command finished");
    Ok(CommandOutput {
        exit_code,
        stdout,
        stderr,
        duration_ms,
    })
}
