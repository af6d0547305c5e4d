//! Error taxonomy for the build engine.
//!
//! Every lower layer returns a [`CmError`]; only the CLI entry point decides
//! whether to print and exit.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = CmError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CmError {
    /// Bad search root or an I/O failure while walking it.
    #[error("could not locate source files in {root}: {reason}")]
    Discovery { root: PathBuf, reason: String },

    /// Configuration that cannot be turned into a compiler call.
    #[error("invalid build configuration: {0}")]
    Invocation(String),

    /// External process exited non-zero (or could not be launched).
    #[error("`{command}` failed ({})", describe_status(.status))]
    Execution {
        command: String,
        status: Option<ExitStatus>,
        output: Vec<u8>,
    },

    /// External process outlived the deadline and was killed.
    #[error("`{command}` exceeded the {}s deadline and was killed", .limit.as_secs())]
    Timeout {
        command: String,
        limit: Duration,
        output: Vec<u8>,
    },

    #[error("could not stage test framework: {0}")]
    Staging(String),

    #[error("cleanup left {} artifact(s) behind: {}", .0.len(), join_paths(.0))]
    Cleanup(Vec<PathBuf>),

    /// The binary compiled but crashed when run after the build.
    #[error("your program compiled but crashed at runtime: {0}")]
    RunFailed(Box<CmError>),
}

impl CmError {
    /// One-line label naming which stage failed.
    pub fn classification(&self) -> &'static str {
        match self {
            CmError::Discovery { .. } => "source discovery failed",
            CmError::Invocation(_) => "could not assemble the compiler invocation",
            CmError::Execution { .. } => "external command failed",
            CmError::Timeout { .. } => "external command timed out",
            CmError::Staging(_) => "test framework staging failed",
            CmError::Cleanup(_) => "test cleanup failed",
            CmError::RunFailed(_) => "compiled but crashed",
        }
    }

    /// Combined stdout/stderr captured from the failing process, if any.
    pub fn output(&self) -> Option<&[u8]> {
        match self {
            CmError::Execution { output, .. } | CmError::Timeout { output, .. } => {
                Some(output.as_slice())
            }
            CmError::RunFailed(inner) => inner.output(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            CmError::Timeout { .. } => true,
            CmError::RunFailed(inner) => inner.is_timeout(),
            _ => false,
        }
    }
}

fn describe_status(status: &Option<ExitStatus>) -> String {
    match status {
        Some(s) => match s.code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        },
        None => "could not be started".to_string(),
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
