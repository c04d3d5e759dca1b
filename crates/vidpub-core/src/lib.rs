//! vidpub core library
//!
//! Domain models, error types, and configuration shared by every vidpub crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, PipelineConfig, RemuxFailurePolicy};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AspectClass, CreateVideoRequest, MediaReference, StorageKey, ThumbnailEntry, UrlStrategy,
    VideoRecord, VideoResponse,
};
pub use storage_types::{StorageBackend, ThumbnailBackend};
