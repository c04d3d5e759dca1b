use uuid::Uuid;

/// Thumbnail bytes plus their declared media type, keyed by video identity.
///
/// Re-uploading for the same video replaces the entry wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailEntry {
    pub video_id: Uuid,
    pub media_type: String,
    pub data: Vec<u8>,
}
