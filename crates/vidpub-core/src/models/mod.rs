//! Domain models shared by every vidpub crate.

pub mod aspect;
pub mod reference;
pub mod storage_key;
pub mod thumbnail;
pub mod video;

pub use aspect::AspectClass;
pub use reference::{MediaReference, UrlStrategy};
pub use storage_key::StorageKey;
pub use thumbnail::ThumbnailEntry;
pub use video::{CreateVideoRequest, VideoRecord, VideoResponse};
