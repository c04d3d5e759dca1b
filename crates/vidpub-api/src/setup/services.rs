//! Wiring of the upload pipeline and shared services into `AppState`

use std::sync::Arc;

use anyhow::Result;
use vidpub_core::Config;
use vidpub_db::VideoRepository;
use vidpub_processing::video::UploadPipelineConfig;
use vidpub_processing::{
    MediaProber, ProcessRunner, Remuxer, StagingArea, VideoUploadOrchestrator,
    VideoUploadValidator,
};
use vidpub_storage::{ReferenceResolver, Storage, ThumbnailSink};

use crate::auth::JwtService;
use crate::state::AppState;

/// Build the application state from its collaborators.
///
/// Storage, process runner and sinks are passed in so tests can substitute them.
pub fn initialize_services(
    config: Config,
    videos: Arc<dyn VideoRepository>,
    storage: Arc<dyn Storage>,
    runner: Arc<dyn ProcessRunner>,
    thumbnails: Arc<dyn ThumbnailSink>,
) -> Result<Arc<AppState>> {
    let resolver = ReferenceResolver::new(storage.clone(), config.url_strategy()?);

    let uploads = VideoUploadOrchestrator::new(
        videos.clone(),
        storage.clone(),
        resolver.clone(),
        StagingArea::new(config.pipeline.staging_dir.clone()),
        MediaProber::new(runner.clone(), config.ffprobe_path().to_string()),
        Remuxer::new(runner, config.ffmpeg_path().to_string()),
        VideoUploadValidator::new(config.video_allowed_content_types().to_vec()),
        UploadPipelineConfig {
            max_video_size_bytes: config.max_video_size_bytes(),
            remux_failure_policy: config.pipeline.remux_failure_policy,
        },
    );

    tracing::info!(
        bucket = %storage.bucket(),
        storage_backend = %storage.backend_type(),
        url_strategy = %resolver.strategy().name(),
        staging_dir = %config.pipeline.staging_dir.display(),
        "Upload pipeline initialized"
    );

    Ok(Arc::new(AppState {
        jwt: JwtService::new(config.jwt_secret()),
        config: Arc::new(config),
        videos,
        storage,
        resolver,
        uploads: Arc::new(uploads),
        thumbnails,
    }))
}
