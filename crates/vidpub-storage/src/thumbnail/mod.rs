//! Thumbnail sink
//!
//! Thumbnails skip the video pipeline: the declared media type is checked against the
//! image allow-list and the bytes go straight to a sink, keyed by video id. A new upload
//! for the same video replaces the previous one.

pub mod filesystem;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use vidpub_core::{AppError, Config, ThumbnailBackend, ThumbnailEntry};

pub use filesystem::FilesystemThumbnailSink;
pub use memory::{InMemoryThumbnailStore, MemoryThumbnailSink, ThumbnailStore};

/// Extensions a thumbnail's declared media type must map to.
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Unsupported thumbnail type: {0}")]
    UnsupportedType(String),

    #[error("Thumbnail not found for video {0}")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ThumbnailError> for AppError {
    fn from(err: ThumbnailError) -> Self {
        match err {
            ThumbnailError::UnsupportedType(media_type) => AppError::UnsupportedMediaType(format!(
                "Thumbnail must be image/jpeg or image/png, got {}",
                media_type
            )),
            ThumbnailError::NotFound(_) => AppError::NotFound("Couldn't find thumbnail".to_string()),
            ThumbnailError::Io(e) => AppError::Io(e.to_string()),
        }
    }
}

/// Destination for thumbnail uploads
#[async_trait]
pub trait ThumbnailSink: Send + Sync {
    /// Validate and store a thumbnail, replacing any previous one for the video.
    /// Returns the URL clients fetch the thumbnail from.
    async fn store(
        &self,
        video_id: Uuid,
        data: Vec<u8>,
        media_type: &str,
    ) -> Result<String, ThumbnailError>;

    /// Current thumbnail for the video, if any.
    async fn load(&self, video_id: Uuid) -> Result<Option<ThumbnailEntry>, ThumbnailError>;

    fn backend(&self) -> ThumbnailBackend;
}

/// Normalized media type and file extension for an allowed thumbnail type.
///
/// The check uses the registered extensions of the declared type; the bytes are not sniffed.
pub fn allowed_thumbnail_type(media_type: &str) -> Result<(String, &'static str), ThumbnailError> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let extensions = mime_guess::get_mime_extensions_str(&essence)
        .ok_or_else(|| ThumbnailError::UnsupportedType(media_type.to_string()))?;

    let extension = extensions
        .iter()
        .find(|ext| ALLOWED_EXTENSIONS.contains(*ext))
        .ok_or_else(|| ThumbnailError::UnsupportedType(media_type.to_string()))?;

    // One stored name per type: .jpeg uploads are saved as .jpg
    let extension = if *extension == "png" { "png" } else { "jpg" };

    Ok((essence, extension))
}

/// Create the thumbnail sink selected by configuration
pub fn create_thumbnail_sink(config: &Config) -> Arc<dyn ThumbnailSink> {
    match config.pipeline.thumbnail_backend {
        ThumbnailBackend::Filesystem => Arc::new(FilesystemThumbnailSink::new(
            config.pipeline.assets_root.clone(),
            config.public_base_url().to_string(),
        )),
        ThumbnailBackend::Memory => Arc::new(MemoryThumbnailSink::new(
            Arc::new(InMemoryThumbnailStore::new()),
            config.public_base_url().to_string(),
        )),
    }
}
