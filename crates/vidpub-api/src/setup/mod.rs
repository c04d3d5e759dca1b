//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use std::sync::Arc;

use anyhow::{Context, Result};
use vidpub_core::Config;
use vidpub_db::{InMemoryVideoRepository, PgVideoRepository, VideoRepository};
use vidpub_processing::TokioProcessRunner;
use vidpub_storage::{create_storage, create_thumbnail_sink};

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.base.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        storage_backend = %config.pipeline.storage_backend,
        url_strategy = %config.pipeline.url_strategy,
        thumbnail_backend = %config.pipeline.thumbnail_backend,
        "Configuration loaded and validated successfully"
    );

    let videos: Arc<dyn VideoRepository> = match config.database_url() {
        Some(_) => Arc::new(PgVideoRepository::new(
            database::setup_database(&config).await?,
        )),
        None => {
            tracing::warn!("DATABASE_URL not set, video records are kept in memory");
            Arc::new(InMemoryVideoRepository::new())
        }
    };

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize object storage")?;
    let thumbnails = create_thumbnail_sink(&config);

    let state = services::initialize_services(
        config,
        videos,
        storage,
        Arc::new(TokioProcessRunner::new()),
        thumbnails,
    )?;

    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
