//! API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use launchdeck_daemon::DaemonError;
use serde_json::json;
use thiserror::Error;

/// Task catalog errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No record with this id.
    #[error("Task not found: {0}")]
    NotFound(String),

    /// A patch produced a record that no longer deserializes.
    #[error("Invalid task update: {0}")]
    InvalidPatch(String),

    /// Catalog file could not be parsed or serialized.
    #[error("Task catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown task id or agent label.
    #[error("{0}")]
    NotFound(String),

    /// Request body failed validation; nothing was persisted.
    #[error("{0}")]
    Validation(String),

    /// launchctl rejected the request.
    #[error("{0}")]
    Daemon(String),

    /// A manual run exited abnormally or never started.
    #[error("{message}")]
    Execution {
        message: String,
        output: String,
        stderr: String,
    },

    /// Persistence or other local failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Daemon(_) => StatusCode::OK,
            ApiError::Execution { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => ApiError::NotFound("Task not found".to_string()),
            RegistryError::InvalidPatch(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DaemonError> for ApiError {
    fn from(err: DaemonError) -> Self {
        match err {
            DaemonError::NotFound(_) => ApiError::NotFound("Agent not found".to_string()),
            DaemonError::InvalidLabel(_) | DaemonError::Schedule(_) => {
                ApiError::Validation(err.to_string())
            }
            DaemonError::CommandFailed { .. } | DaemonError::Spawn { .. } => {
                ApiError::Daemon(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::NotFound(error) | ApiError::Internal(error) => json!({ "error": error }),
            ApiError::Validation(error) | ApiError::Daemon(error) => {
                json!({ "success": false, "error": error })
            }
            ApiError::Execution {
                message,
                output,
                stderr,
            } => json!({
                "success": false,
                "error": message,
                "output": output,
                "stderr": stderr,
            }),
        };
        (status, Json(body)).into_response()
    }
}
