use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use uuid::Uuid;

use lingo_types::api::{DataResponse, NotificationList};
use lingo_types::models::Notification;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiPath;
use crate::records;
use crate::state::{AppState, with_db};

/// GET /api/notifications/{user_id}: unread only, newest first.
pub async fn list(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let rows = with_db(&state.db, move |db| db.get_unread_notifications(&user_id.to_string())).await?;
    let unread: Vec<Notification> = rows.into_iter().filter_map(records::notification_from_row).collect();
    Ok(Json(NotificationList::new(unread)))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = with_db(&state.db, move |db| db.mark_notification_read(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("Notification"))?;

    let notification = records::notification_from_row(row)
        .ok_or_else(|| ApiError::Internal(format!("corrupt notification row '{}'", id)))?;
    Ok(Json(DataResponse::new(notification)))
}
