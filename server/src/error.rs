use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deckhand::{JobError, RetrievalError, StorageError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    Internal(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    /// Logs `err` and hides it behind a generic message.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::Internal("Internal server error".to_string())
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(_) => Self::NotFound(err.to_string()),
            JobError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            JobError::ResourceExhausted(_) => Self::internal(err),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => Self::NotFound(err.to_string()),
            StorageError::OutsideRoot(_) => Self::BadRequest(err.to_string()),
            _ => Self::internal(err),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Conflict(message) => (StatusCode::CONFLICT, message),
        };

        let body = ErrorResponse {
            error: message,
            status: "error",
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: &'static str,
}
