//! Error types shared across the agent
//!
//! Read paths return [`ProbeError`] so callers can tell "field unavailable"
//! apart from "field is legitimately zero". Mutating paths return
//! [`ContainerError`], which keeps input validation failures separate from
//! downstream command failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to read one value from the kernel-exposed tree or a helper command.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("no readable sensor")]
    NoSensor,

    #[error(transparent)]
    Command(#[from] ExecError),
}

impl ProbeError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            what,
            detail: detail.into(),
        }
    }
}

/// Failure of an external command invocation.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Rejected container request; never reaches the runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid action")]
    InvalidAction(String),

    #[error("Container ID required")]
    MissingId,

    #[error("Invalid container ID format")]
    InvalidId,
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Command(#[from] ExecError),

    #[error("unexpected runtime output: {0}")]
    UnexpectedOutput(String),
}

#[derive(Error, Debug)]
pub enum SpeedtestError {
    #[error(transparent)]
    Command(#[from] ExecError),

    #[error("invalid speedtest output: {0}")]
    Output(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::MissingId.to_string(), "Container ID required");
        assert_eq!(
            ValidationError::InvalidAction("delete".into()).to_string(),
            "Invalid action"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = ExecError::Timeout {
            program: "docker".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "docker timed out after 30s");
    }
}
