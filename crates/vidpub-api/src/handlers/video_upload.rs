use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use vidpub_core::constants::VIDEO_FORM_FIELD;
use vidpub_core::{AppError, VideoResponse};

use crate::auth::Principal;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::videos::to_response;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/videos/{video_id}/video",
    tag = "videos",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "MP4 file in the `video` field"),
    responses(
        (status = 200, description = "Video published", body = VideoResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing token or not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported content type", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, HttpAppError> {
    let video_id = Uuid::parse_str(&video_id)?;

    // Ownership is settled before a single body byte is read.
    let video = state.uploads.authorize(principal.user_id, video_id).await?;

    // Dropped with this future when the client goes away, which stops the pipeline.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FORM_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        state
            .uploads
            .validate_content_type(content_type.as_deref())?;

        tracing::info!(
            video_id = %video_id,
            user_id = %principal.user_id,
            content_type = ?content_type,
            "Uploading video"
        );

        let published = state
            .uploads
            .run(video, content_type.as_deref(), field, &cancel)
            .await?;

        return Ok(Json(to_response(&state, published.record).await));
    }

    Err(AppError::InvalidInput(format!("Missing form field '{}'", VIDEO_FORM_FIELD)).into())
}
