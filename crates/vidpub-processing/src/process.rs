//! External process execution
//!
//! ffprobe and ffmpeg are reached only through [`ProcessRunner`] so that tests can
//! substitute scripted tools and so that every invocation honours cancellation.

use std::ffi::OsString;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::ProcessingError;

/// Captured result of a finished process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` to completion. When `cancel` fires first the process is killed
    /// and `ProcessingError::Cancelled` is returned.
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessingError>;
}

/// Runs real executables with `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessingError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessingError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // Dropping the wait future drops the child, which kills it.
        tokio::select! {
            output = child.wait_with_output() => {
                let output = output?;
                Ok(ProcessOutput {
                    status: output.status.code(),
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            _ = cancel.cancelled() => {
                tracing::debug!(program = %program, "Killing process after cancellation");
                Err(ProcessingError::Cancelled)
            }
        }
    }
}

/// Reject executable paths containing shell metacharacters or traversal.
pub fn validate_executable(path: &str) -> Result<(), String> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.is_empty() {
        return Err("Executable path is empty".to_string());
    }
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(format!("Executable path contains dangerous characters: {}", path));
    }
    if path.contains("..") {
        return Err(format!("Executable path contains directory traversal: {}", path));
    }
    Ok(())
}
