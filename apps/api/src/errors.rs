use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed interview_json: {0}")]
    MalformedInterview(String),

    /// The agent finished without ever calling its save tool.
    #[error("Artifact not produced: {0}")]
    ArtifactNotProduced(String),

    /// The agent called its save tool, but no call produced valid output.
    #[error("Artifact invalid: {0}")]
    ArtifactInvalid(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Body extraction failures (wrong content type, syntax errors, wrong field types)
/// answer with the same JSON error body as every other validation failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::MalformedInterview(msg) => (
                StatusCode::BAD_REQUEST,
                "MALFORMED_INTERVIEW_JSON",
                format!("interview_json is not valid JSON: {msg}"),
            ),
            AppError::ArtifactNotProduced(msg) => {
                tracing::warn!("Artifact not produced: {msg}");
                (StatusCode::NOT_FOUND, "ARTIFACT_NOT_PRODUCED", msg.clone())
            }
            AppError::ArtifactInvalid(msg) => {
                tracing::error!("Artifact invalid: {msg}");
                (StatusCode::BAD_GATEWAY, "ARTIFACT_INVALID", msg.clone())
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
