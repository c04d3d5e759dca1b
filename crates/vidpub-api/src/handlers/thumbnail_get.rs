use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use uuid::Uuid;
use vidpub_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/thumbnails/{video_id}",
    tag = "thumbnails",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Thumbnail bytes with their stored media type"),
        (status = 400, description = "Invalid video ID", body = ErrorResponse),
        (status = 404, description = "No thumbnail for this video", body = ErrorResponse)
    )
)]
pub async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video_id = Uuid::parse_str(&video_id)?;

    let entry = state
        .thumbnails
        .load(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Couldn't find thumbnail".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, entry.media_type),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        entry.data,
    ))
}
