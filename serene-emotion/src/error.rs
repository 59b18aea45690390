//! Error types for serene-emotion
//!
//! [`InferenceError`] is internal to the orchestration layer: the text and
//! speech clients convert every variant into a degraded result, so none of
//! them reach a route handler. [`ApiError`] covers request validation only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to an inference worker or analyzer subprocess
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceError {
    /// No process handle (never started, shut down, or exited)
    #[error("Worker is not running")]
    WorkerNotRunning,

    /// Process exited while the request was pending
    #[error("Worker terminated while request was pending")]
    WorkerTerminated,

    /// No response within the timeout horizon
    #[error("Request timed out after {}ms", .0.as_millis())]
    RequestTimeout(Duration),

    /// Output line or document could not be parsed
    #[error("Invalid worker response: {0}")]
    InvalidWorkerResponse(String),

    /// Worker answered with an `{"error": ...}` object
    #[error("Worker reported error: {0}")]
    WorkerReported(String),

    /// Audio path absent at call time
    #[error("Audio file not found: {}", .0.display())]
    AudioFileMissing(PathBuf),

    /// Subprocess failed to start, or its pipes could not be used
    #[error("Failed to spawn worker: {0}")]
    SpawnError(String),

    /// Request could not be encoded
    #[error("Failed to encode request: {0}")]
    Serialization(String),
}

impl InferenceError {
    /// Short machine-readable code for logs and degraded results
    pub fn code(&self) -> &'static str {
        match self {
            InferenceError::WorkerNotRunning => "worker_not_running",
            InferenceError::WorkerTerminated => "worker_terminated",
            InferenceError::RequestTimeout(_) => "request_timeout",
            InferenceError::InvalidWorkerResponse(_) => "invalid_worker_response",
            InferenceError::WorkerReported(_) => "worker_reported_error",
            InferenceError::AudioFileMissing(_) => "audio_file_missing",
            InferenceError::SpawnError(_) => "spawn_error",
            InferenceError::Serialization(_) => "serialization_error",
        }
    }
}

/// Result type for worker and analyzer calls
pub type InferenceResult<T> = Result<T, InferenceError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
