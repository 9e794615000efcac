//! Child process execution.
//!
//! Both calls wait for the child to exit and return a [`ProcessOutput`];
//! nothing is streamed through callbacks.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// Result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output (empty when output was passed through).
    pub stdout: String,
}

impl ProcessOutput {
    /// Whether the process exited with code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Turn a non-zero exit into [`Error::ProcessFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error unless the exit code is 0.
    pub fn check(self, program: &Path) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let status = self
            .exit_code
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
        Err(Error::process(program.display().to_string(), status))
    }
}

/// Child process primitive.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` and capture its standard output silently.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessFailed`] if the process cannot be spawned.
    async fn output(&self, program: &Path, args: &[&str]) -> Result<ProcessOutput>;

    /// Run `program` with output passed through to this process's log.
    ///
    /// When `search_path` is given it becomes the child's `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessFailed`] if the process cannot be spawned.
    async fn run(
        &self,
        program: &Path,
        args: &[&str],
        search_path: Option<&OsStr>,
    ) -> Result<ProcessOutput>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn output(&self, program: &Path, args: &[&str]) -> Result<ProcessOutput> {
        debug!(program = ?program, ?args, "Running process (captured)");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::process(program.display().to_string(), e.to_string()))?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    async fn run(
        &self,
        program: &Path,
        args: &[&str],
        search_path: Option<&OsStr>,
    ) -> Result<ProcessOutput> {
        debug!(program = ?program, ?args, ?search_path, "Running process");

        let mut command = Command::new(program);
        if let Some(path) = search_path {
            command.env("PATH", path);
        }
        let status = command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Error::process(program.display().to_string(), e.to_string()))?;

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout: String::new(),
        })
    }
}
