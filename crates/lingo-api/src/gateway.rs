use axum::{
    extract::{State, WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::debug;

use lingo_gateway::connection;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::middleware::{bearer_token, decode_token};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    token: Option<String>,
}

/// GET /gateway: authenticate, then hand the socket to the connection loop.
/// Browsers cannot set headers on an upgrade request, so the token may also
/// arrive as `?token=`.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GatewayQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers)
        .or(query.token.as_deref())
        .ok_or(ApiError::Unauthorized)?;
    let claims = decode_token(&state.jwt_secret, token)?;

    debug!("Gateway upgrade for {} ({})", claims.username, claims.sub);
    let broadcaster = state.broadcaster.clone();
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, broadcaster, claims.sub, claims.username)
    }))
}
