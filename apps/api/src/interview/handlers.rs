//! Axum route handlers for the Interview API.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header::HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::artifacts::ArtifactKind;
use crate::interview::models::QuestionSet;
use crate::interview::persister::SaveResultTool;
use crate::interview::prompts::{
    build_evaluation_prompt, build_question_prompt, EVALUATION_MESSAGE, EVALUATOR_AGENT,
    QUESTION_SETTER_AGENT,
};
use crate::interview::service::{run_session, SessionOutput, SessionPlan};
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub jobdesc: Option<String>,
    pub criteria: Option<String>,
    /// Seed instruction sent to the question setter as the user message.
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EvaluateRequest {
    pub jobdesc: Option<String>,
    pub criteria: Option<String>,
    /// JSON-encoded QuestionSet with `answer` fields filled in.
    pub interview_json: Option<String>,
}

/// `session_id` is kept as text so an unparseable id is a no-op, not a rejected request.
#[derive(Debug, Deserialize)]
pub struct HousekeepingQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HousekeepingResponse {
    pub message: &'static str,
    pub removed: usize,
}

/// Returns the value when present and non-blank.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

fn missing_fields() -> AppError {
    AppError::Validation("Missing required fields".to_string())
}

fn session_response(output: SessionOutput) -> Response {
    let mut response = Json(output.document).into_response();
    if let Ok(value) = HeaderValue::from_str(&output.session_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(SESSION_HEADER), value);
    }
    response
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /generate-questions
///
/// Runs the question setter and returns the QuestionSet it saved.
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    payload: Result<Json<GenerateQuestionsRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let (Some(jobdesc), Some(criteria), Some(message)) = (
        present(&request.jobdesc),
        present(&request.criteria),
        present(&request.message),
    ) else {
        return Err(missing_fields());
    };

    let kind = ArtifactKind::Questions;
    let output = run_session(
        &state,
        SessionPlan {
            kind,
            agent_name: QUESTION_SETTER_AGENT,
            instructions: build_question_prompt(
                jobdesc,
                criteria,
                SaveResultTool::tool_name(kind),
            ),
            message,
        },
    )
    .await?;

    info!(session_id = %output.session_id, "Questions generated");
    Ok(session_response(output))
}

/// POST /evaluate
///
/// Parses the candidate's answers, runs the evaluator and returns the EvaluationReport it saved.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let (Some(jobdesc), Some(criteria), Some(interview_raw)) = (
        present(&request.jobdesc),
        present(&request.criteria),
        present(&request.interview_json),
    ) else {
        return Err(missing_fields());
    };

    let interview: Value = serde_json::from_str(interview_raw)
        .map_err(|e| AppError::MalformedInterview(e.to_string()))?;

    match QuestionSet::deserialize(&interview) {
        Ok(set) => info!(
            "Evaluating {} answered of {} questions",
            set.answered_count(),
            set.questions.len()
        ),
        Err(e) => warn!("interview_json is not a QuestionSet, forwarding as-is: {e}"),
    }

    let interview_json = serde_json::to_string_pretty(&interview)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize interview: {e}")))?;

    let kind = ArtifactKind::Evaluation;
    let output = run_session(
        &state,
        SessionPlan {
            kind,
            agent_name: EVALUATOR_AGENT,
            instructions: build_evaluation_prompt(
                jobdesc,
                criteria,
                &interview_json,
                SaveResultTool::tool_name(kind),
            ),
            message: EVALUATION_MESSAGE,
        },
    )
    .await?;

    info!(session_id = %output.session_id, "Evaluation completed");
    Ok(session_response(output))
}

/// GET /housekeeping
///
/// Deletes persisted artifacts, for one session when `session_id` is given, otherwise all.
/// Always succeeds; calling it repeatedly is harmless. An id that is not a UUID
/// names no session, so nothing is removed.
pub async fn handle_housekeeping(
    State(state): State<AppState>,
    Query(query): Query<HousekeepingQuery>,
) -> Json<HousekeepingResponse> {
    let removed = match present(&query.session_id) {
        Some(raw) => match Uuid::parse_str(raw.trim()) {
            Ok(session_id) => state.artifacts.remove_session(session_id).await,
            Err(e) => {
                warn!("Housekeeping ignored invalid session_id {raw:?}: {e}");
                0
            }
        },
        None => state.artifacts.clear().await,
    };
    info!("Housekeeping removed {removed} artifact file(s)");

    Json(HousekeepingResponse {
        message: "Housekeeping completed, files removed.",
        removed,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
