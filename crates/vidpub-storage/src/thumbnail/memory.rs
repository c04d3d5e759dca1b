use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use vidpub_core::constants::THUMBNAILS_ROUTE;
use vidpub_core::{ThumbnailBackend, ThumbnailEntry};

use super::{allowed_thumbnail_type, ThumbnailError, ThumbnailSink};

const SHARD_COUNT: usize = 16;

/// Keyed store behind [`MemoryThumbnailSink`]
///
/// Implementations must make `put` and `get` for the same video id linearizable.
#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    /// Insert or replace the entry for `entry.video_id`.
    async fn put(&self, entry: ThumbnailEntry) -> Result<(), ThumbnailError>;

    async fn get(&self, video_id: Uuid) -> Result<Option<ThumbnailEntry>, ThumbnailError>;
}

/// Process-wide thumbnail map split into independently locked shards
pub struct InMemoryThumbnailStore {
    shards: Vec<RwLock<HashMap<Uuid, ThumbnailEntry>>>,
}

impl InMemoryThumbnailStore {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, video_id: &Uuid) -> &RwLock<HashMap<Uuid, ThumbnailEntry>> {
        &self.shards[(video_id.as_u128() % SHARD_COUNT as u128) as usize]
    }
}

impl Default for InMemoryThumbnailStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThumbnailStore for InMemoryThumbnailStore {
    async fn put(&self, entry: ThumbnailEntry) -> Result<(), ThumbnailError> {
        self.shard(&entry.video_id)
            .write()
            .await
            .insert(entry.video_id, entry);
        Ok(())
    }

    async fn get(&self, video_id: Uuid) -> Result<Option<ThumbnailEntry>, ThumbnailError> {
        Ok(self.shard(&video_id).read().await.get(&video_id).cloned())
    }
}

/// Thumbnails kept in a [`ThumbnailStore`] and served by the thumbnail lookup route.
pub struct MemoryThumbnailSink {
    store: Arc<dyn ThumbnailStore>,
    public_base_url: String,
}

impl MemoryThumbnailSink {
    pub fn new(store: Arc<dyn ThumbnailStore>, public_base_url: String) -> Self {
        Self {
            store,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ThumbnailSink for MemoryThumbnailSink {
    async fn store(
        &self,
        video_id: Uuid,
        data: Vec<u8>,
        media_type: &str,
    ) -> Result<String, ThumbnailError> {
        let (media_type, _) = allowed_thumbnail_type(media_type)?;
        let size = data.len();

        self.store
            .put(ThumbnailEntry {
                video_id,
                media_type,
                data,
            })
            .await?;

        tracing::info!(video_id = %video_id, size_bytes = size, "Thumbnail stored in memory");

        Ok(format!(
            "{}{}/{}",
            self.public_base_url, THUMBNAILS_ROUTE, video_id
        ))
    }

    async fn load(&self, video_id: Uuid) -> Result<Option<ThumbnailEntry>, ThumbnailError> {
        self.store.get(video_id).await
    }

    fn backend(&self) -> ThumbnailBackend {
        ThumbnailBackend::Memory
    }
}
