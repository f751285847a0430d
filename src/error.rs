//! Error taxonomy shared by the HTTP handlers and the socket router.
//!
//! Internals are logged server-side; clients only ever see the status line.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::board::WireError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt stored snapshot: {0}")]
    Snapshot(#[from] WireError),
    #[error("corrupt stored move list: {0}")]
    MoveLog(#[from] serde_json::Error),
    #[error("password hashing failed")]
    Hash,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Conflict(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(e) => {
                error!("database error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "database error")
            }
            AppError::Snapshot(e) => {
                error!("stored snapshot is corrupt: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
            AppError::MoveLog(e) => {
                error!("stored move list is corrupt: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
            AppError::Hash => (StatusCode::INTERNAL_SERVER_ERROR, "password hashing failed"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid credentials"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not found"),
            AppError::Conflict(message) => (StatusCode::CONFLICT, message),
        };
        (status, message).into_response()
    }
}
