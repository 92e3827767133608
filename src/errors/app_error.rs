use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::core::{AttemptError, TranscriptionError};

pub type AppResult<T> = Result<T, AppError>;

/// Errors returned by HTTP handlers.
///
/// Rendered as `{"success": false, "error": "..."}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Remote(#[from] AttemptError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Transcription(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
            AppError::Transcription(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Provider client errors (bad key, unknown id) keep their status.
            AppError::Remote(AttemptError::Status { status, .. }) => {
                StatusCode::from_u16(*status)
                    .ok()
                    .filter(|code| code.is_client_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Remote(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", self);
        }

        (
            status,
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
