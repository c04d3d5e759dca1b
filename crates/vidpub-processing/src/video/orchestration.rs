//! Video upload orchestration: stage → probe → key → remux → upload → publish → persist.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use vidpub_core::constants::VIDEO_CONTENT_TYPE;
use vidpub_core::{AppError, AspectClass, RemuxFailurePolicy, StorageKey, VideoRecord};
use vidpub_db::{get_or_not_found, VideoRepository};
use vidpub_storage::{generate_key, ReferenceResolver, Storage, StorageError};

use crate::error::{PipelineError, ProcessingError, UploadStage};
use crate::probe::MediaProber;
use crate::remux::Remuxer;
use crate::staging::StagingArea;
use crate::validator::VideoUploadValidator;

/// Settings for the upload pipeline
#[derive(Debug, Clone)]
pub struct UploadPipelineConfig {
    pub max_video_size_bytes: usize,
    pub remux_failure_policy: RemuxFailurePolicy,
}

/// A video record the caller has been verified to own.
///
/// Only [`VideoUploadOrchestrator::authorize`] creates one, so an upload cannot start
/// staging before the ownership check has passed.
#[derive(Debug)]
pub struct AuthorizedVideo {
    record: VideoRecord,
}

impl AuthorizedVideo {
    pub fn video_id(&self) -> Uuid {
        self.record.id
    }

    pub fn record(&self) -> &VideoRecord {
        &self.record
    }
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct PublishedVideo {
    pub record: VideoRecord,
    pub key: StorageKey,
    pub aspect: AspectClass,
}

pub struct VideoUploadOrchestrator {
    repo: Arc<dyn VideoRepository>,
    storage: Arc<dyn Storage>,
    resolver: ReferenceResolver,
    staging: StagingArea,
    prober: MediaProber,
    remuxer: Remuxer,
    validator: VideoUploadValidator,
    config: UploadPipelineConfig,
}

impl VideoUploadOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn VideoRepository>,
        storage: Arc<dyn Storage>,
        resolver: ReferenceResolver,
        staging: StagingArea,
        prober: MediaProber,
        remuxer: Remuxer,
        validator: VideoUploadValidator,
        config: UploadPipelineConfig,
    ) -> Self {
        Self {
            repo,
            storage,
            resolver,
            staging,
            prober,
            remuxer,
            validator,
            config,
        }
    }

    /// Load the record and check that `user_id` owns it. Performs no file I/O.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<AuthorizedVideo, AppError> {
        let record = get_or_not_found(self.repo.as_ref(), video_id).await?;
        if !record.is_owned_by(user_id) {
            tracing::debug!(video_id = %video_id, user_id = %user_id, "Upload rejected: not the owner");
            return Err(AppError::Unauthorized(
                "You are not the owner of this video".to_string(),
            ));
        }
        Ok(AuthorizedVideo { record })
    }

    /// Check the declared content type and return its essence. Call before reading the
    /// upload body.
    pub fn validate_content_type(
        &self,
        content_type: Option<&str>,
    ) -> Result<String, PipelineError> {
        self.validator
            .validate_content_type(content_type)
            .map_err(|e| PipelineError::new(UploadStage::Received, e))
    }

    /// Run the pipeline for an authorized video.
    ///
    /// Temp files are removed on every exit path. The record is updated only after the
    /// object is published; if that update fails the object is deleted again.
    #[tracing::instrument(skip_all, fields(video_id = %video.video_id()))]
    pub async fn run<S, E>(
        &self,
        video: AuthorizedVideo,
        content_type: Option<&str>,
        stream: S,
        cancel: &CancellationToken,
    ) -> Result<PublishedVideo, PipelineError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        let start = std::time::Instant::now();
        let AuthorizedVideo { mut record } = video;
        let video_id = record.id;

        let declared_type = self.validate_content_type(content_type)?;
        tracing::debug!(video_id = %video_id, stage = %UploadStage::Received, "Upload received");

        let staged = self
            .staging
            .stage(stream, self.config.max_video_size_bytes, cancel)
            .await
            .map_err(|e| PipelineError::new(UploadStage::Staged, e))?;
        tracing::debug!(
            video_id = %video_id,
            stage = %UploadStage::Staged,
            size_bytes = staged.size(),
            "Upload staged"
        );

        let aspect = self.prober.probe_aspect(staged.path(), cancel).await;
        if cancel.is_cancelled() {
            return Err(PipelineError::new(
                UploadStage::Probed,
                ProcessingError::Cancelled,
            ));
        }
        let key = generate_key(aspect);
        tracing::debug!(
            video_id = %video_id,
            stage = %UploadStage::Probed,
            aspect = %aspect,
            key = %key,
            "Upload probed"
        );

        // Held until the end of the function so the file outlives the upload.
        let remuxed = match self.remuxer.fast_start(staged.path(), cancel).await {
            Ok(remuxed) => Some(remuxed),
            Err(ProcessingError::Cancelled) => {
                return Err(PipelineError::new(
                    UploadStage::Remuxed,
                    ProcessingError::Cancelled,
                ))
            }
            Err(e) => match self.config.remux_failure_policy {
                RemuxFailurePolicy::Abort => {
                    return Err(PipelineError::new(UploadStage::Remuxed, e));
                }
                RemuxFailurePolicy::UploadOriginal => {
                    tracing::warn!(
                        video_id = %video_id,
                        error = %e,
                        "Fast-start remux failed, uploading the original file"
                    );
                    None
                }
            },
        };
        // The remuxer always writes MP4; the original keeps its declared type.
        let (upload_path, upload_type): (&Path, &str) = match &remuxed {
            Some(remuxed) => (remuxed.path(), VIDEO_CONTENT_TYPE),
            None => (staged.path(), declared_type.as_str()),
        };
        tracing::debug!(video_id = %video_id, stage = %UploadStage::Remuxed, "Upload remuxed");

        // Backends abort their own partial writes when cancelled.
        let size = self
            .storage
            .upload_file(&key, upload_path, upload_type, cancel)
            .await
            .map_err(|e| match e {
                StorageError::Cancelled => {
                    PipelineError::new(UploadStage::Uploaded, ProcessingError::Cancelled)
                }
                e => PipelineError::new(UploadStage::Uploaded, e),
            })?;
        tracing::debug!(
            video_id = %video_id,
            stage = %UploadStage::Uploaded,
            size_bytes = size,
            "Upload stored"
        );

        let reference = self.resolver.reference_for(key.as_str());
        tracing::debug!(
            video_id = %video_id,
            stage = %UploadStage::Published,
            strategy = self.resolver.strategy().name(),
            "Upload published"
        );

        record.video_reference = Some(reference);
        let record = match self.repo.update(record).await {
            Ok(record) => record,
            Err(e) => {
                self.discard(&key).await;
                return Err(PipelineError::new(
                    UploadStage::Persisted,
                    ProcessingError::Metadata(e),
                ));
            }
        };

        tracing::info!(
            video_id = %video_id,
            key = %key,
            aspect = %aspect,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video upload completed"
        );

        Ok(PublishedVideo {
            record,
            key,
            aspect,
        })
    }

    /// Best-effort removal of an object that will not be referenced.
    async fn discard(&self, key: &StorageKey) {
        if let Err(e) = self.storage.delete(key.as_str()).await {
            tracing::debug!(error = %e, key = %key, "Failed to delete unreferenced object");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMediaTools, ProbeBehavior, RemuxBehavior};
    use futures::stream;
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;
    use vidpub_core::{MediaReference, UrlStrategy};
    use vidpub_db::InMemoryVideoRepository;
    use vidpub_storage::LocalStorage;

    struct Harness {
        _dir: tempfile::TempDir,
        staging_dir: PathBuf,
        objects_dir: PathBuf,
        repo: Arc<InMemoryVideoRepository>,
        storage: Arc<LocalStorage>,
        tools: Arc<FakeMediaTools>,
        orchestrator: VideoUploadOrchestrator,
    }

    async fn harness(
        probe: ProbeBehavior,
        remux: RemuxBehavior,
        policy: RemuxFailurePolicy,
        repo: Arc<dyn VideoRepository>,
        memory_repo: Arc<InMemoryVideoRepository>,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let staging_dir = dir.path().join("staging");
        let objects_dir = dir.path().join("objects");
        let storage = Arc::new(
            LocalStorage::new(&objects_dir, "http://localhost:8091/objects".to_string())
                .await
                .unwrap(),
        );
        let tools = Arc::new(FakeMediaTools::new(probe, remux));
        let resolver = ReferenceResolver::new(
            storage.clone(),
            UrlStrategy::Signed {
                ttl: Duration::from_secs(60),
            },
        );
        let orchestrator = VideoUploadOrchestrator::new(
            repo,
            storage.clone(),
            resolver,
            StagingArea::new(&staging_dir),
            MediaProber::new(tools.clone(), "ffprobe".to_string()),
            Remuxer::new(tools.clone(), "ffmpeg".to_string()),
            VideoUploadValidator::new(vec!["video/mp4".to_string()]),
            UploadPipelineConfig {
                max_video_size_bytes: 1024,
                remux_failure_policy: policy,
            },
        );
        Harness {
            _dir: dir,
            staging_dir,
            objects_dir,
            repo: memory_repo,
            storage,
            tools,
            orchestrator,
        }
    }

    async fn default_harness(
        probe: ProbeBehavior,
        remux: RemuxBehavior,
        policy: RemuxFailurePolicy,
    ) -> Harness {
        let repo = Arc::new(InMemoryVideoRepository::new());
        harness(probe, remux, policy, repo.clone(), repo).await
    }

    fn body(data: &'static [u8]) -> impl Stream<Item = Result<Bytes, io::Error>> + Send {
        stream::iter(vec![Ok(Bytes::from_static(data))])
    }

    async fn files_under(dir: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
                continue;
            };
            while let Some(entry) = entries.next_entry().await.unwrap() {
                let path = entry.path();
                if entry.file_type().await.unwrap().is_dir() {
                    pending.push(path);
                } else {
                    found.push(path);
                }
            }
        }
        found
    }

    async fn draft(h: &Harness, owner: Uuid) -> VideoRecord {
        h.repo
            .create(VideoRecord::draft(owner, "Boots".to_string(), None))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_landscape_upload_is_published_and_persisted() {
        let h = default_harness(
            ProbeBehavior::aspect("16:9"),
            RemuxBehavior::MoveIndexToFront,
            RemuxFailurePolicy::Abort,
        )
        .await;
        let owner = Uuid::new_v4();
        let record = draft(&h, owner).await;

        let authorized = h.orchestrator.authorize(owner, record.id).await.unwrap();
        let published = h
            .orchestrator
            .run(
                authorized,
                Some("video/mp4"),
                body(b"mdat-moov"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(published.aspect, AspectClass::Landscape);
        assert!(published.key.as_str().starts_with("landscape/"));
        assert!(published.key.as_str().ends_with(".mp4"));
        assert_eq!(
            h.storage.download(published.key.as_str()).await.unwrap(),
            b"moov-mdat"
        );

        let stored = h.repo.get(record.id).await.unwrap().unwrap();
        assert_eq!(
            stored.video_reference,
            Some(MediaReference::Signed {
                bucket: "local".to_string(),
                key: published.key.as_str().to_string()
            })
        );
        assert_eq!(stored, published.record);
        assert!(files_under(&h.staging_dir).await.is_empty());
        assert_eq!(h.tools.probe_calls(), 1);
        assert_eq!(h.tools.remux_calls(), 1);
    }

    #[tokio::test]
    async fn test_non_owner_is_rejected_without_io() {
        let h = default_harness(
            ProbeBehavior::default(),
            RemuxBehavior::default(),
            RemuxFailurePolicy::Abort,
        )
        .await;
        let record = draft(&h, Uuid::new_v4()).await;

        let err = h
            .orchestrator
            .authorize(Uuid::new_v4(), record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(h.tools.invocations().is_empty());
        assert!(!h.staging_dir.exists());
    }

    #[tokio::test]
    async fn test_unknown_video_is_not_found() {
        let h = default_harness(
            ProbeBehavior::default(),
            RemuxBehavior::default(),
            RemuxFailurePolicy::Abort,
        )
        .await;
        let err = h
            .orchestrator
            .authorize(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remux_failure_aborts_and_cleans_up() {
        let h = default_harness(
            ProbeBehavior::default(),
            RemuxBehavior::Fail,
            RemuxFailurePolicy::Abort,
        )
        .await;
        let owner = Uuid::new_v4();
        let record = draft(&h, owner).await;

        let authorized = h.orchestrator.authorize(owner, record.id).await.unwrap();
        let err = h
            .orchestrator
            .run(
                authorized,
                Some("video/mp4"),
                body(b"mdat-moov"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, UploadStage::Remuxed);
        assert!(matches!(err.source, ProcessingError::ProcessFailed { .. }));
        assert!(files_under(&h.objects_dir).await.is_empty());
        assert!(files_under(&h.staging_dir).await.is_empty());
        assert_eq!(h.repo.get(record.id).await.unwrap().unwrap(), record);
    }

    #[tokio::test]
    async fn test_remux_failure_can_upload_original() {
        let h = default_harness(
            ProbeBehavior::aspect("9:16"),
            RemuxBehavior::Unavailable,
            RemuxFailurePolicy::UploadOriginal,
        )
        .await;
        let owner = Uuid::new_v4();
        let record = draft(&h, owner).await;

        let authorized = h.orchestrator.authorize(owner, record.id).await.unwrap();
        let published = h
            .orchestrator
            .run(
                authorized,
                Some("video/mp4"),
                body(b"mdat-moov"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(published.key.as_str().starts_with("portrait/"));
        assert_eq!(
            h.storage.download(published.key.as_str()).await.unwrap(),
            b"mdat-moov"
        );
        assert!(files_under(&h.staging_dir).await.is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_falls_back_to_other() {
        let h = default_harness(
            ProbeBehavior::Fail,
            RemuxBehavior::MoveIndexToFront,
            RemuxFailurePolicy::Abort,
        )
        .await;
        let owner = Uuid::new_v4();
        let record = draft(&h, owner).await;

        let authorized = h.orchestrator.authorize(owner, record.id).await.unwrap();
        let published = h
            .orchestrator
            .run(
                authorized,
                Some("video/mp4"),
                body(b"mdat-moov"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(published.aspect, AspectClass::Other);
        assert!(published.key.as_str().starts_with("other/"));
    }

    #[tokio::test]
    async fn test_disallowed_content_type_is_rejected_before_staging() {
        let h = default_harness(
            ProbeBehavior::default(),
            RemuxBehavior::default(),
            RemuxFailurePolicy::Abort,
        )
        .await;
        let owner = Uuid::new_v4();
        let record = draft(&h, owner).await;

        let authorized = h.orchestrator.authorize(owner, record.id).await.unwrap();
        let err = h
            .orchestrator
            .run(
                authorized,
                Some("video/quicktime"),
                body(b"mdat-moov"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, UploadStage::Received);
        assert!(matches!(err.source, ProcessingError::Validation(_)));
        assert!(!h.staging_dir.exists());
        assert!(h.tools.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_fails_while_staging() {
        let h = default_harness(
            ProbeBehavior::default(),
            RemuxBehavior::default(),
            RemuxFailurePolicy::Abort,
        )
        .await;
        let owner = Uuid::new_v4();
        let record = draft(&h, owner).await;

        let authorized = h.orchestrator.authorize(owner, record.id).await.unwrap();
        let err = h
            .orchestrator
            .run(
                authorized,
                Some("video/mp4"),
                body(&[0u8; 2048]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, UploadStage::Staged);
        assert!(matches!(err.source, ProcessingError::TooLarge { max: 1024 }));
        assert!(files_under(&h.staging_dir).await.is_empty());
        assert!(h.tools.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_during_remux_cleans_up() {
        let h = default_harness(
            ProbeBehavior::default(),
            RemuxBehavior::HangUntilCancelled,
            RemuxFailurePolicy::UploadOriginal,
        )
        .await;
        let owner = Uuid::new_v4();
        let record = draft(&h, owner).await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let authorized = h.orchestrator.authorize(owner, record.id).await.unwrap();
        let err = h
            .orchestrator
            .run(authorized, Some("video/mp4"), body(b"mdat-moov"), &cancel)
            .await
            .unwrap_err();

        // Cancellation is never treated as a remux failure to fall back from.
        assert_eq!(err.stage, UploadStage::Remuxed);
        assert!(matches!(err.source, ProcessingError::Cancelled));
        assert!(files_under(&h.objects_dir).await.is_empty());
        assert!(files_under(&h.staging_dir).await.is_empty());
    }

    struct RejectingUpdates(Arc<InMemoryVideoRepository>);

    #[async_trait::async_trait]
    impl VideoRepository for RejectingUpdates {
        async fn create(&self, record: VideoRecord) -> Result<VideoRecord, AppError> {
            self.0.create(record).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError> {
            self.0.get(id).await
        }

        async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<VideoRecord>, AppError> {
            self.0.list_for_user(user_id).await
        }

        async fn update(&self, _record: VideoRecord) -> Result<VideoRecord, AppError> {
            Err(AppError::Conflict("modified concurrently".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_metadata_update_deletes_published_object() {
        let memory = Arc::new(InMemoryVideoRepository::new());
        let h = harness(
            ProbeBehavior::default(),
            RemuxBehavior::MoveIndexToFront,
            RemuxFailurePolicy::Abort,
            Arc::new(RejectingUpdates(memory.clone())),
            memory,
        )
        .await;
        let owner = Uuid::new_v4();
        let record = draft(&h, owner).await;

        let authorized = h.orchestrator.authorize(owner, record.id).await.unwrap();
        let err = h
            .orchestrator
            .run(
                authorized,
                Some("video/mp4"),
                body(b"mdat-moov"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, UploadStage::Persisted);
        assert!(matches!(
            err.source,
            ProcessingError::Metadata(AppError::Conflict(_))
        ));
        assert!(files_under(&h.objects_dir).await.is_empty());
        assert!(files_under(&h.staging_dir).await.is_empty());
    }

    /// Object store whose uploads only finish by being cancelled.
    #[derive(Default)]
    struct StalledUploads {
        started: tokio::sync::Notify,
        deletes: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Storage for StalledUploads {
        fn bucket(&self) -> &str {
            "videos"
        }

        async fn upload_file(
            &self,
            _: &StorageKey,
            _: &Path,
            _: &str,
            cancel: &CancellationToken,
        ) -> vidpub_storage::StorageResult<u64> {
            self.started.notify_one();
            cancel.cancelled().await;
            Err(StorageError::Cancelled)
        }

        async fn download(&self, key: &str) -> vidpub_storage::StorageResult<Vec<u8>> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn delete(&self, _: &str) -> vidpub_storage::StorageResult<()> {
            self.deletes
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        async fn get_presigned_url(
            &self,
            key: &str,
            _: Duration,
        ) -> vidpub_storage::StorageResult<String> {
            Ok(format!("https://videos.example.com/{}", key))
        }

        fn backend_type(&self) -> vidpub_storage::StorageBackend {
            vidpub_storage::StorageBackend::S3
        }
    }

    #[tokio::test]
    async fn test_cancellation_during_upload_is_handed_to_storage() {
        let dir = tempfile::tempdir().unwrap();
        let staging_dir = dir.path().join("staging");
        let repo = Arc::new(InMemoryVideoRepository::new());
        let storage = Arc::new(StalledUploads::default());
        let tools = Arc::new(FakeMediaTools::new(
            ProbeBehavior::default(),
            RemuxBehavior::MoveIndexToFront,
        ));
        let orchestrator = VideoUploadOrchestrator::new(
            repo.clone(),
            storage.clone(),
            ReferenceResolver::new(
                storage.clone(),
                UrlStrategy::Signed {
                    ttl: Duration::from_secs(60),
                },
            ),
            StagingArea::new(&staging_dir),
            MediaProber::new(tools.clone(), "ffprobe".to_string()),
            Remuxer::new(tools.clone(), "ffmpeg".to_string()),
            VideoUploadValidator::new(vec!["video/mp4".to_string()]),
            UploadPipelineConfig {
                max_video_size_bytes: 1024,
                remux_failure_policy: RemuxFailurePolicy::Abort,
            },
        );

        let owner = Uuid::new_v4();
        let record = repo
            .create(VideoRecord::draft(owner, "Boots".to_string(), None))
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let uploading = storage.clone();
        tokio::spawn(async move {
            uploading.started.notified().await;
            trigger.cancel();
        });

        let authorized = orchestrator.authorize(owner, record.id).await.unwrap();
        let err = orchestrator
            .run(authorized, Some("video/mp4"), body(b"mdat-moov"), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.stage, UploadStage::Uploaded);
        assert!(matches!(err.source, ProcessingError::Cancelled));
        // The backend discarded its own partial write; nothing was published to delete.
        assert_eq!(
            storage.deletes.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
        assert!(files_under(&staging_dir).await.is_empty());
        assert_eq!(repo.get(record.id).await.unwrap().unwrap(), record);
    }
}
