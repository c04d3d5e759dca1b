use std::collections::HashMap;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;
use vidpub_core::{AppError, VideoRecord};

use crate::repository::VideoRepository;

/// Process-local video repository
#[derive(Default)]
pub struct InMemoryVideoRepository {
    records: RwLock<HashMap<Uuid, VideoRecord>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn create(&self, record: VideoRecord) -> Result<VideoRecord, AppError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(AppError::Conflict(format!(
                "Video {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<VideoRecord>, AppError> {
        let records = self.records.read().await;
        let mut owned: Vec<VideoRecord> = records
            .values()
            .filter(|r| r.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update(&self, mut record: VideoRecord) -> Result<VideoRecord, AppError> {
        let mut records = self.records.write().await;
        let current = records
            .get(&record.id)
            .ok_or_else(|| AppError::Conflict(format!("Video {} no longer exists", record.id)))?;

        if current.updated_at != record.updated_at {
            return Err(AppError::Conflict(format!(
                "Video {} was modified concurrently",
                record.id
            )));
        }

        // Strictly increasing so a stale copy can never match again.
        let now = Utc::now();
        record.updated_at = if now > current.updated_at {
            now
        } else {
            current.updated_at + Duration::microseconds(1)
        };
        records.insert(record.id, record.clone());
        Ok(record)
    }
}
