//! Video record management

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use vidpub_core::{AppError, CreateVideoRequest, VideoRecord, VideoResponse};
use vidpub_db::get_or_not_found;

use crate::auth::Principal;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Resolve the record's video reference for the response. Signed URLs are minted here.
pub(crate) async fn to_response(state: &AppState, record: VideoRecord) -> VideoResponse {
    let video_url = state
        .resolver
        .resolve_opt(record.video_reference.as_ref())
        .await;
    VideoResponse::from_record(record, video_url)
}

#[utoipa::path(
    post,
    path = "/api/videos",
    tag = "videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Draft video created", body = VideoResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoResponse>), HttpAppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title must not be empty".to_string()).into());
    }

    let record = VideoRecord::draft(principal.user_id, title.to_string(), request.description);
    let record = state.videos.create(record).await?;
    tracing::info!(video_id = %record.id, user_id = %principal.user_id, "Video created");

    Ok((StatusCode::CREATED, Json(to_response(&state, record).await)))
}

#[utoipa::path(
    get,
    path = "/api/videos",
    tag = "videos",
    responses(
        (status = 200, description = "Caller's videos, newest first", body = Vec<VideoResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<VideoResponse>>, HttpAppError> {
    let records = state.videos.list_for_user(principal.user_id).await?;

    let mut videos = Vec::with_capacity(records.len());
    for record in records {
        videos.push(to_response(&state, record).await);
    }
    Ok(Json(videos))
}

#[utoipa::path(
    get,
    path = "/api/videos/{video_id}",
    tag = "videos",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video with its URL resolved", body = VideoResponse),
        (status = 400, description = "Invalid video ID", body = ErrorResponse),
        (status = 401, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>, HttpAppError> {
    let video_id = Uuid::parse_str(&video_id)?;
    let record = get_or_not_found(state.videos.as_ref(), video_id).await?;
    if !record.is_owned_by(principal.user_id) {
        return Err(AppError::Unauthorized("You are not the owner of this video".to_string()).into());
    }

    Ok(Json(to_response(&state, record).await))
}
