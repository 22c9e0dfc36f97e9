//! Interview sessions — one agent run per request, result handed back through the artifact store.
//!
//! Flow: new session id → save tool bound to that session → agent run (bounded
//! by the configured timeout) → inspect the tool outcome → read the artifact back.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::artifacts::ArtifactKind;
use crate::interview::models::{document_issues, EvaluationReport, QuestionSet};
use crate::interview::persister::{PersistOutcome, SaveResultTool};
use crate::llm_client::agent::Agent;
use crate::state::AppState;

/// A finished session: its id and the document the agent saved.
#[derive(Debug)]
pub struct SessionOutput {
    pub session_id: Uuid,
    pub document: Value,
}

/// What to run for one session.
pub struct SessionPlan<'a> {
    pub kind: ArtifactKind,
    pub agent_name: &'a str,
    pub instructions: String,
    pub message: &'a str,
}

pub async fn run_session(state: &AppState, plan: SessionPlan<'_>) -> Result<SessionOutput, AppError> {
    let session_id = Uuid::new_v4();
    let span = info_span!("interview_session", %session_id, agent = plan.agent_name);
    run_session_inner(state, session_id, plan)
        .instrument(span)
        .await
}

async fn run_session_inner(
    state: &AppState,
    session_id: Uuid,
    plan: SessionPlan<'_>,
) -> Result<SessionOutput, AppError> {
    let tool = SaveResultTool::new(state.artifacts.clone(), session_id, plan.kind);
    let outcome = tool.outcome_handle();
    let agent = Agent::new(plan.agent_name, plan.instructions).with_tool(Arc::new(tool));

    let timeout = Duration::from_secs(state.config.agent_timeout_secs);
    let run = tokio::time::timeout(timeout, state.runner.run(&agent, plan.message))
        .await
        .map_err(|_| {
            AppError::Llm(format!(
                "Agent run timed out after {}s",
                state.config.agent_timeout_secs
            ))
        })?
        .map_err(|e| AppError::Llm(format!("Agent run failed: {e}")))?;

    info!(
        turns = run.turns,
        tool_calls = run.tool_calls,
        "Agent finished: stop_reason={:?}",
        run.stop_reason
    );
    debug!("Agent final text: {:?}", run.final_output);

    let outcome = outcome
        .lock()
        .map(|o| o.clone())
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Persist outcome lock poisoned")))?;

    match outcome {
        PersistOutcome::NotInvoked => {
            return Err(AppError::ArtifactNotProduced(format!(
                "The agent did not save {}",
                plan.kind.file_name()
            )));
        }
        PersistOutcome::Failed {
            reason,
            invocations,
        } => {
            return Err(AppError::ArtifactInvalid(format!(
                "The agent's output could not be saved after {invocations} attempt(s): {reason}"
            )));
        }
        PersistOutcome::Saved {
            path,
            bytes,
            invocations,
        } => {
            info!(
                "Artifact saved to {} ({bytes} bytes) after {invocations} tool call(s)",
                path.display()
            );
        }
    }

    let document = state
        .artifacts
        .read(session_id, plan.kind)
        .await?
        .ok_or_else(|| AppError::NotFound("JSON file not found".to_string()))?;

    let issues = match plan.kind {
        ArtifactKind::Questions => document_issues(&document, QuestionSet::shape_issues),
        ArtifactKind::Evaluation => document_issues(&document, EvaluationReport::shape_issues),
    };
    for issue in &issues {
        warn!("{}: {issue}", plan.kind.file_name());
    }

    Ok(SessionOutput {
        session_id,
        document,
    })
}
