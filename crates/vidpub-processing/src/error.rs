use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

use vidpub_core::AppError;
use vidpub_storage::StorageError;

use crate::validator::ValidationError;

/// Errors raised inside the upload pipeline
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Upload exceeds the maximum size of {max} bytes")]
    TooLarge { max: usize },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {status:?}: {stderr}")]
    ProcessFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Upload cancelled")]
    Cancelled,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Metadata update failed: {0}")]
    Metadata(#[source] AppError),
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Io(e) => AppError::Io(e.to_string()),
            ProcessingError::TooLarge { max } => AppError::PayloadTooLarge(format!(
                "Video exceeds the maximum upload size of {} MB",
                max / (1024 * 1024)
            )),
            ProcessingError::Spawn { .. } | ProcessingError::ProcessFailed { .. } => {
                AppError::Process(err.to_string())
            }
            ProcessingError::Cancelled => AppError::Io("upload cancelled".to_string()),
            ProcessingError::Validation(e) => e.into(),
            ProcessingError::Storage(e) => e.into(),
            ProcessingError::Metadata(e) => e,
        }
    }
}

/// States of a video upload, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadStage {
    Received,
    Staged,
    Probed,
    Remuxed,
    Uploaded,
    Published,
    Persisted,
}

impl Display for UploadStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            UploadStage::Received => "received",
            UploadStage::Staged => "staged",
            UploadStage::Probed => "probed",
            UploadStage::Remuxed => "remuxed",
            UploadStage::Uploaded => "uploaded",
            UploadStage::Published => "published",
            UploadStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// A pipeline failure. `stage` is the state the pipeline failed to reach.
#[derive(Debug, thiserror::Error)]
#[error("Upload failed before reaching {stage}: {source}")]
pub struct PipelineError {
    pub stage: UploadStage,
    #[source]
    pub source: ProcessingError,
}

impl PipelineError {
    pub fn new(stage: UploadStage, source: impl Into<ProcessingError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        err.source.into()
    }
}
