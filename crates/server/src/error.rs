// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leveling_sync_core::{ProgressError, TailError};
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not syncing")]
    NotSyncing,

    #[error("A poll is already in progress")]
    PollInProgress,

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Log file error: {0}")]
    Tail(#[from] TailError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::NotSyncing => (StatusCode::NOT_FOUND, ErrorResponse::new("Not syncing")),
            ApiError::PollInProgress => (
                StatusCode::CONFLICT,
                ErrorResponse::new("A poll is already in progress"),
            ),
            ApiError::StepNotFound(id) => {
                tracing::warn!(step_id = %id, "Step not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Step not found", format!("Step ID: {id}")),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Tail(tail_err) => {
                let (status, error_msg) = match tail_err {
                    TailError::SourceUnavailable { path, source } => {
                        tracing::warn!(path = %path.display(), error = %source, "Log file unavailable");
                        (StatusCode::NOT_FOUND, "Log file unavailable")
                    }
                    TailError::Io { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "IO error reading log file");
                        (StatusCode::INTERNAL_SERVER_ERROR, "IO error reading log file")
                    }
                };
                (status, ErrorResponse::with_details(error_msg, tail_err.to_string()))
            }
            ApiError::Progress(progress_err) => {
                let error_msg = match progress_err {
                    ProgressError::PermissionDenied { path } => {
                        tracing::error!(path = %path.display(), "Permission denied saving progress");
                        "Cannot write progress file"
                    }
                    ProgressError::Io { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "IO error saving progress");
                        "IO error saving progress"
                    }
                    ProgressError::MalformedJson { path, message } => {
                        tracing::error!(path = %path.display(), message = %message, "Malformed progress JSON");
                        "Malformed progress data"
                    }
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details(error_msg, progress_err.to_string()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Internal server error", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
