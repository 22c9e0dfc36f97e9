// Interview question generation and answer evaluation.
// Every model interaction goes through llm_client::agent; results come back via the save tool.

pub mod artifacts;
pub mod handlers;
pub mod models;
pub mod persister;
pub mod prompts;
pub mod service;
