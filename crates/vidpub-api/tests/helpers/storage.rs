//! In-memory object storage whose presigned URLs really expire.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use vidpub_core::{StorageBackend, StorageKey};
use vidpub_storage::{Storage, StorageError, StorageResult};

pub const TEST_BUCKET: &str = "test-videos";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Object store double. URLs look like `memory://{bucket}/{key}?expires={unix_secs}` and are
/// checked against a clock the test can move forward.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    clock_offset_secs: Mutex<i64>,
    uploads: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn now(&self) -> i64 {
        Utc::now().timestamp() + *self.clock_offset_secs.lock().unwrap()
    }

    /// Move the storage clock forward.
    pub fn advance(&self, by: Duration) {
        *self.clock_offset_secs.lock().unwrap() += by.as_secs() as i64;
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn upload_count(&self) -> usize {
        *self.uploads.lock().unwrap()
    }

    /// Fetch through a presigned URL the way a client would.
    pub fn fetch(&self, url: &str) -> StorageResult<Vec<u8>> {
        let rest = url
            .strip_prefix(&format!("memory://{}/", TEST_BUCKET))
            .ok_or_else(|| StorageError::AccessDenied(format!("Foreign URL: {}", url)))?;
        let (key, expires) = rest
            .split_once("?expires=")
            .ok_or_else(|| StorageError::AccessDenied("Missing signature".to_string()))?;
        let expires: i64 = expires
            .parse()
            .map_err(|_| StorageError::AccessDenied("Malformed expiry".to_string()))?;

        if self.now() > expires {
            return Err(StorageError::AccessDenied("Request has expired".to_string()));
        }

        self.object(key)
            .map(|object| object.data)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn bucket(&self) -> &str {
        TEST_BUCKET
    }

    async fn upload_file(
        &self,
        key: &StorageKey,
        path: &Path,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<u64> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        let data = tokio::fs::read(path).await?;
        let size = data.len() as u64;
        self.objects.lock().unwrap().insert(
            key.as_str().to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        *self.uploads.lock().unwrap() += 1;
        Ok(size)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.object(storage_key)
            .map(|object| object.data)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(storage_key);
        Ok(())
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "memory://{}/{}?expires={}",
            TEST_BUCKET,
            storage_key,
            self.now() + expires_in.as_secs() as i64
        ))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
