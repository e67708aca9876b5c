use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use ivd_core::error::CoreError;
use ivd_core::store::StoreError;
use ivd_flows::{ReviewError, SubmitError};

/// Message shown to contributors when the submit transaction fails.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit. Please try again.";

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain and flow errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `ivd_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failed submit attempt.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// A refused or failed review decision.
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// A backend call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Submit(err) => match err {
                SubmitError::Incomplete(core) => classify_core_error(core),
                SubmitError::Upload(store) => {
                    tracing::error!(error = %store, "Image upload failed");
                    upstream(SUBMIT_FAILED_MESSAGE)
                }
                SubmitError::Insert {
                    orphaned_path,
                    source,
                } => {
                    tracing::error!(
                        error = %source,
                        orphaned_path = %orphaned_path,
                        "Submission insert failed"
                    );
                    upstream(SUBMIT_FAILED_MESSAGE)
                }
                SubmitError::Interrupted => {
                    tracing::error!("Submit task ended without an outcome");
                    upstream(SUBMIT_FAILED_MESSAGE)
                }
            },

            AppError::Review(err) => match err {
                ReviewError::NotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Submission with id {id} not found"),
                ),
                ReviewError::NotPending { .. } => {
                    (StatusCode::CONFLICT, "CONFLICT", err.to_string())
                }
                ReviewError::Store(store) => {
                    tracing::error!(error = %store, "Review decision not recorded");
                    upstream("Failed to record the review decision")
                }
            },

            AppError::Store(store) => {
                tracing::error!(error = %store, "Backend call failed");
                upstream("The data backend is unavailable")
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

fn upstream(message: &str) -> (StatusCode, &'static str, String) {
    (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message.to_string())
}
