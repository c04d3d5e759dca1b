//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object storage backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use vidpub_core::{AppError, StorageKey};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upload cancelled")]
    Cancelled,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object not found: {}", key)),
            StorageError::IoError(e) => AppError::Io(e.to_string()),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Object storage abstraction
///
/// Backends are bound to a single bucket. Uploads stream from a file on disk so that
/// large videos are never buffered in memory.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Bucket every key of this backend lives in
    fn bucket(&self) -> &str;

    /// Stream the file at `path` to `key` with the given content type.
    /// Returns the number of bytes written.
    ///
    /// When `cancel` fires the partial object is discarded and `Cancelled` is returned.
    async fn upload_file(
        &self,
        key: &StorageKey,
        path: &Path,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<u64>;

    /// Download an object by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object by its storage key
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Generate a time-limited GET URL for an object
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
