use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use lingo_types::api::ErrorResponse;
use lingo_types::models::UnsupportedLanguage;

pub type ApiResult<T> = Result<T, ApiError>;

/// Boundary error for every handler. Each variant maps to one status code;
/// only the 5xx variants carry internals, and those are logged rather than
/// sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    // -- 404 --
    #[error("Sender not found")]
    SenderNotFound,

    #[error("Receiver not found")]
    ReceiverNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    // -- 400 --
    #[error(transparent)]
    UnsupportedLanguage(#[from] UnsupportedLanguage),

    #[error("{0}")]
    Validation(String),

    // -- auth --
    #[error("Not authorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    // -- uploads --
    #[error("Unsupported media type")]
    UnsupportedMediaType,

    #[error("Payload too large")]
    PayloadTooLarge,

    // -- 500 --
    #[error("Adapter failure: {0}")]
    Adapter(anyhow::Error),

    #[error("Persistence failure: {0}")]
    Persistence(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::SenderNotFound | Self::ReceiverNotFound | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnsupportedLanguage(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Adapter(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// lingo-db reports everything as `anyhow`; anything surfacing from it
/// unhandled is a persistence failure.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("{}", self);
            "Server Error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
