use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use uuid::Uuid;

use lingo_types::api::UploadResponse;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiBytes;
use crate::state::AppState;

/// 25 MB upload limit for attachments, enforced by the route's body limit
pub const MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Accepted media types and the extension the stored file gets.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("application/pdf", "pdf"),
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/webm", "webm"),
    ("video/webm", "webm"),
];

fn extension_for(headers: &HeaderMap) -> Option<&'static str> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    // Drop parameters such as "; codecs=opus".
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// POST /api/files: stores the raw body under the upload directory and
/// returns the public URL to pass to the attachment send endpoints.
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiBytes(bytes): ApiBytes,
) -> ApiResult<impl IntoResponse> {
    let ext = extension_for(&headers).ok_or(ApiError::UnsupportedMediaType)?;

    if bytes.is_empty() {
        return Err(ApiError::validation("file is empty"));
    }

    let file_name = format!("{}.{}", Uuid::new_v4(), ext);

    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!("Failed to create upload directory {}: {}", state.upload_dir.display(), e);
        ApiError::Internal(e.to_string())
    })?;

    let file_path = state.upload_dir.join(&file_name);
    let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
        error!("Failed to create file {}: {}", file_path.display(), e);
        ApiError::Internal(e.to_string())
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", file_path.display(), e);
        ApiError::Internal(e.to_string())
    })?;
    file.flush().await.map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("Stored upload {} ({} bytes)", file_name, bytes.len());
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            file_url: format!("/uploads/{}", file_name),
            size: bytes.len() as u64,
        }),
    ))
}
