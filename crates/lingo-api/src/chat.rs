use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use lingo_types::api::{DataResponse, SendAttachmentRequest, SendMessageRequest, SendMessageResponse, SentMessages};
use lingo_types::models::{AttachmentKind, ChatMessage, ConversationKey};

use crate::dispatch::{Delivery, parse_participant};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::records;
use crate::state::{AppState, with_db};

/// POST /api/chat/send
pub async fn send_message(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let delivery = state
        .dispatcher
        .send_message(&req.sender, &req.receiver, req.message, req.target_language.as_deref())
        .await?;

    let translations_available = delivery.translations_available;
    let mut messages = delivery.messages;
    let data = if messages.len() == 1 {
        SentMessages::One(messages.remove(0))
    } else {
        SentMessages::Many(messages)
    };

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            success: true,
            data,
            translations_available,
        }),
    ))
}

pub async fn send_image(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendAttachmentRequest>,
) -> ApiResult<impl IntoResponse> {
    send_attachment(state, req, AttachmentKind::Image).await
}

pub async fn send_document(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendAttachmentRequest>,
) -> ApiResult<impl IntoResponse> {
    send_attachment(state, req, AttachmentKind::Document).await
}

pub async fn send_voice(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendAttachmentRequest>,
) -> ApiResult<impl IntoResponse> {
    send_attachment(state, req, AttachmentKind::Voice).await
}

async fn send_attachment(
    state: AppState,
    req: SendAttachmentRequest,
    kind: AttachmentKind,
) -> ApiResult<(StatusCode, Json<DataResponse<ChatMessage>>)> {
    let Delivery { messages, .. } = state
        .dispatcher
        .send_attachment(&req.sender, &req.receiver, kind, req.file_url)
        .await?;

    let message = messages
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("attachment delivery produced no message".into()))?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(message))))
}

/// GET /api/chat/{sender_id}/{receiver_id}: the whole conversation, oldest
/// first, regardless of which side sent each message.
pub async fn get_history(
    State(state): State<AppState>,
    ApiPath((sender_id, receiver_id)): ApiPath<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let sender = parse_participant(&sender_id, "sender")?;
    let receiver = parse_participant(&receiver_id, "receiver")?;
    let key = ConversationKey::new(&sender, &receiver);

    let rows = with_db(&state.db, move |db| db.get_conversation(key.as_str())).await?;
    let messages: Vec<ChatMessage> = rows.into_iter().filter_map(records::message_from_row).collect();

    Ok(Json(DataResponse::new(messages)))
}
