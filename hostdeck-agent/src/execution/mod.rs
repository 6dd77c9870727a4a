//! Command execution module for the agent
//!
//! Every external program (container runtime, `df`, speedtest) runs through a
//! [`CommandRunner`]:
//! - Argument vector only, never a shell string
//! - Bounded by an explicit timeout; the child is killed when it expires
//! - Non-zero exit surfaces as [`ExecError::Failed`], no retries

use crate::error::ExecError;
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

/// One program invocation: program, argv and time budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub execution_time_ms: u128,
}

impl CommandOutput {
    /// stdout then stderr, as one text block.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}{}", self.stdout, self.stderr)
        }
    }
}

/// Executes invocations. Implemented by [`SystemRunner`] and by test doubles.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: Invocation) -> BoxFuture<'_, Result<CommandOutput, ExecError>>;
}

/// Runs real child processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: Invocation) -> BoxFuture<'_, Result<CommandOutput, ExecError>> {
        Box::pin(execute(invocation))
    }
}

async fn execute(invocation: Invocation) -> Result<CommandOutput, ExecError> {
    let start_time = Instant::now();
    debug!("Executing: {} (timeout: {}s)", invocation, invocation.timeout.as_secs());

    let child = AsyncCommand::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(invocation.timeout, child)
        .await
        .map_err(|_| ExecError::Timeout {
            program: invocation.program.clone(),
            timeout: invocation.timeout,
        })?
        .map_err(|source| ExecError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let execution_time_ms = start_time.elapsed().as_millis();

    if !output.status.success() {
        warn!(
            command = %invocation,
            code = ?output.status.code(),
            "Command failed"
        );
        return Err(ExecError::Failed {
            program: invocation.program,
            code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        execution_time_ms,
    })
}
