//! vidpub processing library
//!
//! Everything between a received upload stream and a published, persisted video:
//! staging to a temp file, aspect probing, fast-start remuxing, and the orchestrator
//! that sequences them with object storage and the metadata store.

pub mod error;
pub mod probe;
pub mod process;
pub mod remux;
pub mod staging;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod validator;
pub mod video;

pub use error::{PipelineError, ProcessingError, UploadStage};
pub use probe::MediaProber;
pub use process::{ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use remux::{RemuxedFile, Remuxer};
pub use staging::{StagedFile, StagingArea};
pub use validator::{ValidationError, VideoUploadValidator};
pub use video::{AuthorizedVideo, PublishedVideo, VideoUploadOrchestrator};
