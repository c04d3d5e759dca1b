//! vidpub storage library
//!
//! Object storage abstraction with S3 and local filesystem backends, storage key
//! generation, read-time resolution of persisted references, and the thumbnail sinks.
//!
//! # Storage key format
//!
//! Video keys are `{orientation}/{random}.mp4` where orientation is `landscape`,
//! `portrait` or `other` and `random` is 32 bytes from the OS-seeded CSPRNG encoded as
//! unpadded URL-safe base64. Keys never contain user-supplied text, `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod reference;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod thumbnail;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::generate_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use reference::ReferenceResolver;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use thumbnail::{
    create_thumbnail_sink, FilesystemThumbnailSink, InMemoryThumbnailStore, MemoryThumbnailSink,
    ThumbnailError, ThumbnailSink, ThumbnailStore,
};
pub use traits::{Storage, StorageError, StorageResult};
pub use vidpub_core::StorageBackend;
