//! Fast-start remuxer
//!
//! Copies every stream unchanged (`-c copy`) into a new MP4 whose moov atom precedes
//! the media data, so playback can start before the download finishes.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use tokio_util::sync::CancellationToken;
use vidpub_core::constants::REMUX_SUFFIX;

use crate::error::ProcessingError;
use crate::process::ProcessRunner;

/// Remuxer output; the file is removed when this is dropped.
#[derive(Debug)]
pub struct RemuxedFile {
    path: TempPath,
}

impl RemuxedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub struct Remuxer {
    runner: Arc<dyn ProcessRunner>,
    ffmpeg_path: String,
}

impl Remuxer {
    pub fn new(runner: Arc<dyn ProcessRunner>, ffmpeg_path: String) -> Self {
        Self {
            runner,
            ffmpeg_path,
        }
    }

    /// Sibling output path: the input path plus `.processing`.
    pub fn output_path(input: &Path) -> PathBuf {
        let mut name: OsString = input.as_os_str().to_owned();
        name.push(REMUX_SUFFIX);
        PathBuf::from(name)
    }

    /// Write a fast-start copy of `input` next to it.
    ///
    /// A non-zero exit or a missing executable is a `ProcessFailure`; any partial output
    /// is removed before returning.
    #[tracing::instrument(skip(self, cancel), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    pub async fn fast_start(
        &self,
        input: &Path,
        cancel: &CancellationToken,
    ) -> Result<RemuxedFile, ProcessingError> {
        let start = std::time::Instant::now();
        let output = TempPath::from_path(Self::output_path(input));

        let args: Vec<OsString> = [
            OsStr::new("-y"),
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-c"),
            OsStr::new("copy"),
            OsStr::new("-movflags"),
            OsStr::new("faststart"),
            OsStr::new("-f"),
            OsStr::new("mp4"),
            output.as_os_str(),
        ]
        .into_iter()
        .map(OsStr::to_owned)
        .collect();

        let result = self.runner.run(&self.ffmpeg_path, &args, cancel).await?;

        if !result.success() {
            let stderr = result.stderr_lossy();
            tracing::error!(
                status = ?result.status,
                stderr = %stderr,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "ffmpeg remux failed"
            );
            return Err(ProcessingError::ProcessFailed {
                program: self.ffmpeg_path.clone(),
                status: result.status,
                stderr,
            });
        }

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(ProcessingError::ProcessFailed {
                program: self.ffmpeg_path.clone(),
                status: result.status,
                stderr: "no output file produced".to_string(),
            });
        }

        tracing::debug!(
            output = %output.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remuxed for fast start"
        );

        Ok(RemuxedFile { path: output })
    }
}
