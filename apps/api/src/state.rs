use std::sync::Arc;

use crate::config::Config;
use crate::interview::artifacts::ArtifactStore;
use crate::llm_client::agent::AgentRunner;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Agent runtime. `LlmClient` in production; scripted runners in tests.
    pub runner: Arc<dyn AgentRunner>,
    pub artifacts: ArtifactStore,
    pub config: Config,
}
