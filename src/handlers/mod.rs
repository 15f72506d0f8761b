pub mod status;
pub mod ticks;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::store::StoreError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    StoreUnavailable(String),
    Store(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Unexpected(msg) => Self::Store(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::StoreUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("store unavailable: {msg}"),
            ),
            Self::Store(msg) => (StatusCode::INTERNAL_SERVER_ERROR, format!("store: {msg}")),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
