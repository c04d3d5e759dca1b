//! Video upload module

pub mod orchestration;

pub use orchestration::{
    AuthorizedVideo, PublishedVideo, UploadPipelineConfig, VideoUploadOrchestrator,
};
