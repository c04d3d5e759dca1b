use uuid::Uuid;
use vidpub_core::{AppError, VideoRecord};

/// Trait for video record persistence
/// This abstracts the metadata store (PostgreSQL or in-memory)
#[async_trait::async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert a new record and return it as stored.
    async fn create(&self, record: VideoRecord) -> Result<VideoRecord, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError>;

    /// Records owned by `user_id`, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<VideoRecord>, AppError>;

    /// Persist `record`, returning the stored version with a fresh `updated_at`.
    ///
    /// Fails with `AppError::Conflict` when the record no longer exists or was modified
    /// since `record.updated_at` was read.
    async fn update(&self, record: VideoRecord) -> Result<VideoRecord, AppError>;
}

/// Fetch a record or fail with `NotFound`.
pub async fn get_or_not_found(
    repo: &dyn VideoRepository,
    id: Uuid,
) -> Result<VideoRecord, AppError> {
    repo.get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))
}
