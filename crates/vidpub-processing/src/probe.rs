//! Media prober
//!
//! Classifies a staged video by display aspect ratio using ffprobe. Classification only
//! picks the storage key prefix, so every failure degrades to `AspectClass::Other`.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use vidpub_core::AspectClass;

use crate::process::ProcessRunner;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    display_aspect_ratio: Option<String>,
}

pub struct MediaProber {
    runner: Arc<dyn ProcessRunner>,
    ffprobe_path: String,
}

impl MediaProber {
    pub fn new(runner: Arc<dyn ProcessRunner>, ffprobe_path: String) -> Self {
        Self {
            runner,
            ffprobe_path,
        }
    }

    /// Aspect class of the first video stream. Never fails.
    #[tracing::instrument(skip(self, cancel), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn probe_aspect(&self, path: &Path, cancel: &CancellationToken) -> AspectClass {
        let start = std::time::Instant::now();
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-print_format".into(),
            "json".into(),
            "-show_streams".into(),
            path.as_os_str().to_owned(),
        ];

        let output = match self.runner.run(&self.ffprobe_path, &args, cancel).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "ffprobe could not run, classifying as other");
                return AspectClass::Other;
            }
        };

        if !output.success() {
            tracing::warn!(
                status = ?output.status,
                stderr = %output.stderr_lossy(),
                "ffprobe failed, classifying as other"
            );
            return AspectClass::Other;
        }

        let aspect = classify(&output.stdout);
        tracing::debug!(
            aspect = %aspect,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video probed"
        );
        aspect
    }
}

/// Classify raw `ffprobe -print_format json -show_streams` output.
pub fn classify(probe_json: &[u8]) -> AspectClass {
    let parsed: ProbeOutput = match serde_json::from_slice(probe_json) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable ffprobe output, classifying as other");
            return AspectClass::Other;
        }
    };

    // Audio and data streams carry no aspect ratio; output without codec types
    // falls back to the first stream.
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .or_else(|| {
            parsed
                .streams
                .first()
                .filter(|s| s.codec_type.is_none())
        });

    stream
        .and_then(|s| s.display_aspect_ratio.as_deref())
        .map(AspectClass::from_ratio)
        .unwrap_or(AspectClass::Other)
}
