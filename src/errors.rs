use crate::services::VaultError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for HTTP-facing errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        let status = match &err {
            VaultError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            VaultError::UserNotFound
            | VaultError::FileNotFound(_)
            | VaultError::BlobNotFound(_)
            | VaultError::PublicationNotFound(_)
            | VaultError::TicketNotFound => StatusCode::NOT_FOUND,
            VaultError::PermissionDenied(_) | VaultError::InvalidSignature => {
                StatusCode::FORBIDDEN
            }
            VaultError::TicketExpired | VaultError::TicketUsed => StatusCode::GONE,
            VaultError::Sqlx(_) | VaultError::Io(_) => {
                tracing::error!("storage failure: {err}");
                return AppError::internal("internal storage error");
            }
        };
        AppError::new(status, err.to_string())
    }
}
