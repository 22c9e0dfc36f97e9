//! Result Persister — the "save result" tool handed to the interview agents.
//!
//! The model decides whether and how often to call it. Each call repairs the
//! payload, checks it is well-formed JSON and writes it to the session's
//! artifact path. Failures are logged, recorded and reported back to the model;
//! they never abort the run.
//!
//! The request handler reads the recorded `PersistOutcome` afterwards instead of
//! probing the filesystem to find out whether the tool ran.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::interview::artifacts::{ArtifactKind, ArtifactStore};
use crate::llm_client::agent::{content_input_schema, Tool, ToolOutput};
use crate::llm_client::strip_json_fences;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("content is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing string argument `content`")]
    MissingContent,

    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to the save tool over one agent run.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PersistOutcome {
    #[default]
    NotInvoked,
    Saved {
        path: PathBuf,
        bytes: usize,
        invocations: u32,
    },
    Failed {
        reason: String,
        invocations: u32,
    },
}

impl PersistOutcome {
    pub fn invocations(&self) -> u32 {
        match self {
            PersistOutcome::NotInvoked => 0,
            PersistOutcome::Saved { invocations, .. } | PersistOutcome::Failed { invocations, .. } => {
                *invocations
            }
        }
    }

    fn record_saved(&mut self, path: PathBuf, bytes: usize) {
        let invocations = self.invocations() + 1;
        *self = PersistOutcome::Saved {
            path,
            bytes,
            invocations,
        };
    }

    /// A failure after a successful save keeps the save: the file on disk is still valid.
    fn record_failed(&mut self, reason: String) {
        let invocations = self.invocations() + 1;
        match self {
            PersistOutcome::Saved {
                invocations: count, ..
            } => *count = invocations,
            _ => {
                *self = PersistOutcome::Failed {
                    reason,
                    invocations,
                }
            }
        }
    }
}

/// Shared handle the handler keeps while the tool is owned by the agent.
pub type OutcomeHandle = Arc<Mutex<PersistOutcome>>;

pub struct SaveResultTool {
    name: &'static str,
    description: &'static str,
    kind: ArtifactKind,
    session_id: Uuid,
    store: ArtifactStore,
    outcome: OutcomeHandle,
}

impl SaveResultTool {
    pub const SAVE_QUESTIONS: &'static str = "save_questions";
    pub const SAVE_EVALUATION: &'static str = "save_evaluation_report";

    pub fn new(store: ArtifactStore, session_id: Uuid, kind: ArtifactKind) -> Self {
        let (name, description) = match kind {
            ArtifactKind::Questions => (
                Self::SAVE_QUESTIONS,
                "Saves the generated interview questions. Pass the complete JSON object as `content`.",
            ),
            ArtifactKind::Evaluation => (
                Self::SAVE_EVALUATION,
                "Saves the candidate evaluation report. Pass the complete JSON object as `content`.",
            ),
        };
        Self {
            name,
            description,
            kind,
            session_id,
            store,
            outcome: Arc::new(Mutex::new(PersistOutcome::NotInvoked)),
        }
    }

    pub fn tool_name(kind: ArtifactKind) -> &'static str {
        match kind {
            ArtifactKind::Questions => Self::SAVE_QUESTIONS,
            ArtifactKind::Evaluation => Self::SAVE_EVALUATION,
        }
    }

    pub fn outcome_handle(&self) -> OutcomeHandle {
        self.outcome.clone()
    }

    async fn persist(&self, input: &Value) -> Result<(PathBuf, usize), PersistError> {
        let raw = match input.get("content") {
            Some(Value::String(s)) => s.clone(),
            // Some models pass the object itself instead of a string.
            Some(v @ (Value::Object(_) | Value::Array(_))) => serde_json::to_string_pretty(v)?,
            _ => return Err(PersistError::MissingContent),
        };
        let payload = prepare_payload(&raw)?;
        let path = self.store.write(self.session_id, self.kind, &payload).await?;
        Ok((path, payload.len()))
    }
}

#[async_trait]
impl Tool for SaveResultTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn input_schema(&self) -> Value {
        content_input_schema("The complete JSON object, as text")
    }

    async fn call(&self, input: Value) -> ToolOutput {
        match self.persist(&input).await {
            Ok((path, bytes)) => {
                info!(session_id = %self.session_id, "Saved {} ({bytes} bytes)", path.display());
                if let Ok(mut outcome) = self.outcome.lock() {
                    outcome.record_saved(path, bytes);
                }
                ToolOutput::ok(format!("Saved {}.", self.kind.file_name()))
            }
            Err(e) => {
                error!(session_id = %self.session_id, "{} failed: {e}", self.name);
                if let Ok(mut outcome) = self.outcome.lock() {
                    outcome.record_failed(e.to_string());
                }
                ToolOutput::error(format!("Not saved: {e}"))
            }
        }
    }
}

/// Turns raw tool text into the JSON text that gets written.
///
/// Tried in order, first parse wins:
/// 1. the text as-is (after stripping code fences); a JSON string holding a
///    document is unwrapped once
/// 2. literal `\n`, `\r`, `\t` sequences outside string literals turned into whitespace
/// 3. every backslash escape undone (a fully escaped document)
pub fn prepare_payload(raw: &str) -> Result<String, PersistError> {
    let text = strip_json_fences(raw);

    let first_error = match serde_json::from_str::<Value>(text) {
        Ok(Value::String(inner)) => return prepare_payload(&inner),
        Ok(_) => return Ok(text.to_string()),
        Err(e) => e,
    };

    let repaired = repair_escaped_newlines(text);
    if serde_json::from_str::<Value>(&repaired).is_ok() {
        return Ok(repaired);
    }

    let unescaped = unescape_all(text);
    if serde_json::from_str::<Value>(&unescaped).is_ok() {
        return Ok(unescaped);
    }

    Err(PersistError::InvalidJson(first_error))
}

/// Replaces literal backslash-n/r/t sequences that sit between JSON tokens.
/// Escapes inside string literals are left alone so they stay valid JSON escapes.
pub fn repair_escaped_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('\\', Some('n')) => {
                chars.next();
                out.push('\n');
            }
            ('\\', Some('r')) => {
                chars.next();
                out.push('\r');
            }
            ('\\', Some('t')) => {
                chars.next();
                out.push('\t');
            }
            _ => out.push(c),
        }
    }

    out
}

fn unescape_all(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
