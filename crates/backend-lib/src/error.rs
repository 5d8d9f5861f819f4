// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use livepoll_common::ServerMessage;
use thiserror::Error;

use crate::validation::ValidationError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("A presenter is already connected")]
    PresenterAlreadyPresent,

    #[error("Only the presenter may do this")]
    NotPresenter,

    #[error("This connection has already joined the session")]
    AlreadyJoined,

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session is no longer running")]
    SessionClosed,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::PresenterAlreadyPresent | AppError::AlreadyJoined => StatusCode::CONFLICT,
            AppError::NotPresenter => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::PresenterAlreadyPresent => "SESSION_001",
            AppError::NotPresenter => "SESSION_002",
            AppError::AlreadyJoined => "SESSION_003",
            AppError::Validation(_) => "VAL_001",
            AppError::Config(_) => "CONFIG_001",
            AppError::SessionClosed => "INT_002",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            // Session rules are safe to show verbatim
            AppError::PresenterAlreadyPresent
            | AppError::NotPresenter
            | AppError::AlreadyJoined
            | AppError::Validation(_) => self.to_string(),
            AppError::SessionClosed => "Session unavailable, please try again later".to_string(),
            AppError::Config(_) => "An internal server error occurred".to_string(),
        }
    }

    /// Rejection notice sent back over the WebSocket to the originating connection
    pub fn to_server_message(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.error_code().to_string(),
            message: self.sanitized_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AppError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        AppError::SessionClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for AppError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        AppError::SessionClosed
    }
}
