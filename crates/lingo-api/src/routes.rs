use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::services::ServeDir;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, chat, files, gateway, notifications, themes};

/// Full application router. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/gateway", get(gateway::ws_upgrade))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/api/auth/profile/{user_id}", get(auth::get_profile).put(auth::update_profile))
        .route("/api/auth/users/{user_id}", get(auth::list_users))
        .route("/api/chat/send", post(chat::send_message))
        .route("/api/chat/image", post(chat::send_image))
        .route("/api/chat/docs", post(chat::send_document))
        .route("/api/chat/voice-message", post(chat::send_voice))
        .route("/api/chat/theme", post(themes::save_theme).get(themes::load_theme))
        .route("/api/chat/{sender_id}/{receiver_id}", get(chat::get_history))
        .route("/api/notifications/{id}", get(notifications::list))
        .route("/api/notifications/{id}/read", put(notifications::mark_read))
        .route(
            "/api/files",
            post(files::upload_file).layer(DefaultBodyLimit::max(files::MAX_FILE_SIZE)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let uploads = ServeDir::new(&state.upload_dir);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", uploads)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
