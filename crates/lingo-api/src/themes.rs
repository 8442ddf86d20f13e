use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;

use lingo_db::Database;
use lingo_types::api::{SaveThemeRequest, ThemeQuery, ThemeResponse};
use lingo_types::models::{ConversationKey, Participant, Theme};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::records;
use crate::state::{AppState, with_db};

/// Last write wins; existing messages keep the snapshot they were stored with.
pub async fn set_theme(db: &Arc<Database>, a: &Participant, b: &Participant, theme: &Theme) -> ApiResult<()> {
    if theme.name.trim().is_empty() {
        return Err(ApiError::validation("theme name is required"));
    }

    let key = ConversationKey::new(a, b);
    let row = records::theme_row(theme);
    let (_, updated_at) = records::now();
    with_db(db, move |db| db.upsert_theme(key.as_str(), &row, &updated_at)).await
}

pub async fn get_theme(db: &Arc<Database>, a: &Participant, b: &Participant) -> ApiResult<Theme> {
    let key = ConversationKey::new(a, b);
    with_db(db, move |db| db.get_theme(key.as_str()))
        .await?
        .map(records::theme_from_row)
        .ok_or(ApiError::NotFound("Theme"))
}

/// POST /api/chat/theme
pub async fn save_theme(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SaveThemeRequest>,
) -> ApiResult<impl IntoResponse> {
    set_theme(&state.db, &req.sender, &req.receiver, &req.theme).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/chat/theme?sender=..&receiver=..
pub async fn load_theme(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ThemeQuery>,
) -> ApiResult<impl IntoResponse> {
    let theme = get_theme(&state.db, &query.sender, &query.receiver).await?;
    Ok(Json(ThemeResponse { success: true, theme }))
}
