//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use vidpub_core::constants::{API_PREFIX, ASSETS_ROUTE, OBJECTS_ROUTE};
use vidpub_core::StorageBackend;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

/// Allowance for multipart boundaries and part headers on top of the file size limits.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let config = state.config.clone();
    let video_body_limit = config
        .max_video_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let thumbnail_body_limit = config
        .max_thumbnail_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let max_concurrent_uploads = config.pipeline.max_concurrent_uploads;

    tracing::info!(
        video_body_limit,
        thumbnail_body_limit,
        max_concurrent_uploads,
        "Upload limits configured"
    );

    let videos = Router::new()
        .route(
            "/videos",
            post(handlers::videos::create_video).get(handlers::videos::list_videos),
        )
        .route("/videos/{video_id}", get(handlers::videos::get_video))
        .route(
            "/videos/{video_id}/video",
            post(handlers::video_upload::upload_video)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer::<_, std::convert::Infallible>(RequestBodyLimitLayer::new(video_body_limit))
                .layer(ConcurrencyLimitLayer::new(max_concurrent_uploads)),
        )
        .route(
            "/videos/{video_id}/thumbnail",
            post(handlers::thumbnail_upload::upload_thumbnail)
                .layer(DefaultBodyLimit::max(thumbnail_body_limit)),
        )
        .route(
            "/thumbnails/{video_id}",
            get(handlers::thumbnail_get::get_thumbnail),
        )
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest(API_PREFIX, videos)
        .nest_service(ASSETS_ROUTE, ServeDir::new(&config.pipeline.assets_root));

    // The local backend's "presigned" URLs point here.
    if config.pipeline.storage_backend == StorageBackend::Local {
        app = app.nest_service(
            OBJECTS_ROUTE,
            ServeDir::new(&config.pipeline.local_storage_path),
        );
    }

    app.layer(setup_cors(config.is_production()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Setup CORS configuration
fn setup_cors(is_production: bool) -> CorsLayer {
    if is_production {
        tracing::warn!("CORS configured to allow all origins");
    }
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
