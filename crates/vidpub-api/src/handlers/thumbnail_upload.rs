use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use uuid::Uuid;
use vidpub_core::constants::THUMBNAIL_FORM_FIELD;
use vidpub_core::{AppError, VideoResponse};
use vidpub_db::get_or_not_found;
use vidpub_storage::thumbnail::allowed_thumbnail_type;

use crate::auth::Principal;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::videos::to_response;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/videos/{video_id}/thumbnail",
    tag = "videos",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "JPEG or PNG in the `thumbnail` field"),
    responses(
        (status = 200, description = "Thumbnail stored", body = VideoResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing token or not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported thumbnail type", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, HttpAppError> {
    let video_id = Uuid::parse_str(&video_id)?;

    let mut record = get_or_not_found(state.videos.as_ref(), video_id).await?;
    if !record.is_owned_by(principal.user_id) {
        return Err(AppError::Unauthorized("You are not the owner of this video".to_string()).into());
    }

    let max_bytes = state.config.max_thumbnail_size_bytes();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(THUMBNAIL_FORM_FIELD) {
            continue;
        }

        let media_type = field.content_type().unwrap_or_default().to_string();
        allowed_thumbnail_type(&media_type)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if data.len() + chunk.len() > max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "Thumbnail exceeds the maximum size of {} MB",
                    max_bytes / (1024 * 1024)
                ))
                .into());
            }
            data.extend_from_slice(&chunk);
        }

        let size_bytes = data.len();
        let url = state.thumbnails.store(video_id, data, &media_type).await?;

        record.thumbnail_url = Some(url);
        let record = state.videos.update(record).await?;
        tracing::info!(
            video_id = %video_id,
            size_bytes,
            backend = %state.thumbnails.backend(),
            "Thumbnail stored"
        );

        return Ok(Json(to_response(&state, record).await));
    }

    Err(AppError::InvalidInput(format!("Missing form field '{}'", THUMBNAIL_FORM_FIELD)).into())
}
