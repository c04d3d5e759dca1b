//! Application state shared by all handlers

use std::sync::Arc;

use vidpub_core::Config;
use vidpub_db::VideoRepository;
use vidpub_processing::VideoUploadOrchestrator;
use vidpub_storage::{ReferenceResolver, Storage, ThumbnailSink};

use crate::auth::JwtService;

pub struct AppState {
    pub config: Arc<Config>,
    pub videos: Arc<dyn VideoRepository>,
    pub storage: Arc<dyn Storage>,
    /// Turns stored video references into client URLs at read time
    pub resolver: ReferenceResolver,
    pub uploads: Arc<VideoUploadOrchestrator>,
    pub thumbnails: Arc<dyn ThumbnailSink>,
    pub jwt: JwtService,
}
