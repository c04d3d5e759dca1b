//! Scripted stand-ins for ffprobe and ffmpeg.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ProcessingError;
use crate::process::{ProcessOutput, ProcessRunner};

/// What the fake ffprobe does
#[derive(Debug, Clone)]
pub enum ProbeBehavior {
    /// Exit 0 with this stdout
    Output(String),
    /// Exit 1
    Fail,
    /// Executable not found
    Unavailable,
}

impl ProbeBehavior {
    /// One video stream with the given display aspect ratio
    pub fn aspect(ratio: &str) -> Self {
        ProbeBehavior::Output(format!(
            r#"{{"streams":[{{"index":0,"codec_type":"audio"}},{{"index":1,"codec_type":"video","display_aspect_ratio":"{}"}}]}}"#,
            ratio
        ))
    }
}

impl Default for ProbeBehavior {
    fn default() -> Self {
        ProbeBehavior::aspect("16:9")
    }
}

/// What the fake ffmpeg does
#[derive(Debug, Clone, Default)]
pub enum RemuxBehavior {
    /// Write the input to the output with any `moov` segment (of `-` separated
    /// segments) moved to the front
    #[default]
    MoveIndexToFront,
    /// Write a partial output file, then exit 1
    Fail,
    /// Executable not found
    Unavailable,
    /// Never finish; return only once cancelled
    HangUntilCancelled,
}

/// Fake media tools recording every invocation
#[derive(Debug, Default)]
pub struct FakeMediaTools {
    probe: ProbeBehavior,
    remux: RemuxBehavior,
    invocations: Mutex<Vec<String>>,
}

impl FakeMediaTools {
    pub fn new(probe: ProbeBehavior, remux: RemuxBehavior) -> Self {
        Self {
            probe,
            remux,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Every invocation as `program arg arg ...`
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn probe_calls(&self) -> usize {
        self.invocations()
            .iter()
            .filter(|c| c.starts_with("ffprobe"))
            .count()
    }

    pub fn remux_calls(&self) -> usize {
        self.invocations()
            .iter()
            .filter(|c| c.starts_with("ffmpeg"))
            .count()
    }

    fn record(&self, program: &str, args: &[OsString]) {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        if let Ok(mut calls) = self.invocations.lock() {
            calls.push(line);
        }
    }

    fn not_found(program: &str) -> ProcessingError {
        ProcessingError::Spawn {
            program: program.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        }
    }

    fn exit(status: i32, stdout: &str, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            status: Some(status),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    async fn remux(
        &self,
        program: &str,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessingError> {
        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1))
            .map(PathBuf::from);
        let output = args.last().map(PathBuf::from);
        let (Some(input), Some(output)) = (input, output) else {
            return Ok(Self::exit(1, "", "missing input or output"));
        };

        match self.remux {
            RemuxBehavior::MoveIndexToFront => {
                let data = tokio::fs::read(&input).await?;
                let mut segments: Vec<&[u8]> = data.split(|b| *b == b'-').collect();
                if let Some(pos) = segments.iter().position(|s| *s == b"moov") {
                    let moov = segments.remove(pos);
                    segments.insert(0, moov);
                }
                tokio::fs::write(&output, segments.join(&b'-')).await?;
                Ok(Self::exit(0, "", ""))
            }
            RemuxBehavior::Fail => {
                tokio::fs::write(&output, b"partial").await?;
                Ok(Self::exit(1, "", "moov atom not found"))
            }
            RemuxBehavior::Unavailable => Err(Self::not_found(program)),
            RemuxBehavior::HangUntilCancelled => {
                cancel.cancelled().await;
                Err(ProcessingError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for FakeMediaTools {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessingError> {
        self.record(program, args);

        if program.contains("ffprobe") {
            return match &self.probe {
                ProbeBehavior::Output(stdout) => Ok(Self::exit(0, stdout, "")),
                ProbeBehavior::Fail => Ok(Self::exit(1, "", "Invalid data found")),
                ProbeBehavior::Unavailable => Err(Self::not_found(program)),
            };
        }

        self.remux(program, args, cancel).await
    }
}
