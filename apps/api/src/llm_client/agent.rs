//! Agent runtime — a tool-use loop on top of `LlmClient`.
//!
//! An `Agent` is a system prompt plus a set of tools. Running it sends one user
//! message, executes whatever tool calls the model makes (zero or more, any
//! order, any number of times), feeds the results back, and stops when the
//! model ends its turn or `MAX_TURNS` is reached.
//!
//! Callers never inspect the model's final text for results: tools carry their
//! own side effects and report back through whatever state they were built with.
//!
//! `AppState` holds an `Arc<dyn AgentRunner>` so handlers can be exercised with
//! a scripted runner.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, info_span, warn, Instrument};

use super::{ContentBlock, LlmClient, LlmError, Message, ToolDefinition, Usage};

/// Upper bound on model turns within one run.
pub const MAX_TURNS: u32 = 8;

// ────────────────────────────────────────────────────────────────────────────
// Tools
// ────────────────────────────────────────────────────────────────────────────

/// What a tool hands back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A callback the model may invoke during a run.
///
/// Tools never fail the run: problems are reported to the model as an error
/// `ToolOutput` so it can correct itself.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for the tool's input object.
    fn input_schema(&self) -> Value;
    async fn call(&self, input: Value) -> ToolOutput;
}

// ────────────────────────────────────────────────────────────────────────────
// Agent
// ────────────────────────────────────────────────────────────────────────────

pub struct Agent {
    pub name: String,
    pub instructions: String,
    pub tools: Vec<Arc<dyn Tool>>,
}

impl Agent {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Dispatches a tool call by name. Unknown names are answered with an error output.
    pub async fn invoke_tool(&self, name: &str, input: Value) -> ToolOutput {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.call(input).await,
            None => {
                warn!(agent = %self.name, "Model requested unknown tool '{name}'");
                ToolOutput::error(format!("Unknown tool '{name}'"))
            }
        }
    }
}

/// Summary of a finished run. Callers use it for logging only.
#[derive(Debug, Clone, Default)]
pub struct AgentRunResult {
    pub final_output: Option<String>,
    pub turns: u32,
    pub tool_calls: u32,
    pub usage: Usage,
    pub stop_reason: Option<String>,
    pub duration_ms: i64,
}

/// Anything that can execute an agent run to completion.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, agent: &Agent, message: &str) -> Result<AgentRunResult, LlmError>;
}

#[async_trait]
impl AgentRunner for LlmClient {
    async fn run(&self, agent: &Agent, message: &str) -> Result<AgentRunResult, LlmError> {
        let span = info_span!("agent_run", agent = %agent.name);
        run_tool_loop(self, agent, message).instrument(span).await
    }
}

async fn run_tool_loop(
    llm: &LlmClient,
    agent: &Agent,
    message: &str,
) -> Result<AgentRunResult, LlmError> {
    let started = Utc::now();
    let tools = agent.tool_definitions();
    let mut messages = vec![Message::user_text(message)];
    let mut result = AgentRunResult::default();

    info!("Agent run started with {} tool(s)", tools.len());

    while result.turns < MAX_TURNS {
        let response = llm.call(&agent.instructions, &messages, &tools).await?;
        result.turns += 1;
        result.usage.input_tokens += response.usage.input_tokens;
        result.usage.output_tokens += response.usage.output_tokens;
        result.stop_reason = response.stop_reason.clone();
        result.final_output = response.text().map(str::to_string);

        let tool_uses = response.tool_uses();
        if tool_uses.is_empty() {
            break;
        }

        let mut results = Vec::with_capacity(tool_uses.len());
        for (id, name, input) in tool_uses {
            debug!("Turn {}: model called '{name}'", result.turns);
            result.tool_calls += 1;
            let output = agent.invoke_tool(name, input.clone()).await;
            results.push(ContentBlock::ToolResult {
                tool_use_id: id.to_string(),
                content: output.content,
                is_error: output.is_error,
            });
        }

        // Echo the assistant turn back verbatim, minus blocks we cannot round-trip.
        let assistant_content = response
            .content
            .into_iter()
            .filter(|b| *b != ContentBlock::Unsupported)
            .collect();
        messages.push(Message::assistant(assistant_content));
        messages.push(Message::tool_results(results));

        if result.turns == MAX_TURNS {
            warn!("Agent stopped after {MAX_TURNS} turns without ending its turn");
            result.stop_reason = Some("max_turns".to_string());
        }
    }

    result.duration_ms = (Utc::now() - started).num_milliseconds();
    info!(
        turns = result.turns,
        tool_calls = result.tool_calls,
        input_tokens = result.usage.input_tokens,
        output_tokens = result.usage.output_tokens,
        duration_ms = result.duration_ms,
        "Agent run finished: stop_reason={:?}",
        result.stop_reason
    );

    Ok(result)
}

/// Input schema shared by tools that take a single string argument named `content`.
pub fn content_input_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {
                "type": "string",
                "description": description
            }
        },
        "required": ["content"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, routing::post, Json, Router};
    use std::sync::Mutex;

    struct EchoTool {
        calls: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its content"
        }

        fn input_schema(&self) -> Value {
            content_input_schema("Anything")
        }

        async fn call(&self, input: Value) -> ToolOutput {
            self.calls.lock().unwrap().push(input.clone());
            ToolOutput::ok(format!("echo: {}", input["content"]))
        }
    }

    #[derive(Clone)]
    struct MockApi {
        replies: Arc<Mutex<Vec<Value>>>,
        requests: Arc<Mutex<Vec<Value>>>,
    }

    async fn mock_messages(State(api): State<MockApi>, Json(body): Json<Value>) -> Json<Value> {
        api.requests.lock().unwrap().push(body);
        let mut replies = api.replies.lock().unwrap();
        Json(replies.remove(0))
    }

    /// Serves scripted Messages API replies on an ephemeral port.
    async fn spawn_mock_api(replies: Vec<Value>) -> (String, Arc<Mutex<Vec<Value>>>) {
        let api = MockApi {
            replies: Arc::new(Mutex::new(replies)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let requests = api.requests.clone();
        let app = Router::new()
            .route("/v1/messages", post(mock_messages))
            .with_state(api);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1/messages"), requests)
    }

    fn tool_use_reply(id: &str, name: &str, input: Value) -> Value {
        json!({
            "content": [{"type": "tool_use", "id": id, "name": name, "input": input}],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    fn end_turn_reply(text: &str) -> Value {
        json!({
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 20, "output_tokens": 3}
        })
    }

    #[tokio::test]
    async fn test_run_executes_tool_and_feeds_result_back() {
        let (url, requests) = spawn_mock_api(vec![
            tool_use_reply("toolu_1", "echo", json!({"content": "hi"})),
            end_turn_reply("done"),
        ])
        .await;
        let client = LlmClient::with_api_url("test-key".to_string(), url);
        let tool = Arc::new(EchoTool {
            calls: Mutex::new(Vec::new()),
        });
        let agent = Agent::new("Echo Agent", "system prompt").with_tool(tool.clone());

        let result = client.run(&agent, "please echo").await.unwrap();

        assert_eq!(result.turns, 2);
        assert_eq!(result.tool_calls, 1);
        assert_eq!(result.final_output.as_deref(), Some("done"));
        assert_eq!(result.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(result.usage.input_tokens, 30);
        assert_eq!(tool.calls.lock().unwrap().len(), 1);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["system"], "system prompt");
        assert_eq!(requests[0]["tools"][0]["name"], "echo");
        let second = requests[1]["messages"].as_array().unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second[1]["role"], "assistant");
        assert_eq!(second[2]["content"][0]["type"], "tool_result");
        assert_eq!(second[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(second[2]["content"][0]["content"], "echo: \"hi\"");
    }

    #[tokio::test]
    async fn test_run_without_tool_calls_finishes_in_one_turn() {
        let (url, _) = spawn_mock_api(vec![end_turn_reply("no tools needed")]).await;
        let client = LlmClient::with_api_url("test-key".to_string(), url);
        let tool = Arc::new(EchoTool {
            calls: Mutex::new(Vec::new()),
        });
        let agent = Agent::new("Echo Agent", "system").with_tool(tool.clone());

        let result = client.run(&agent, "hello").await.unwrap();

        assert_eq!(result.turns, 1);
        assert_eq!(result.tool_calls, 0);
        assert!(tool.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_answered_with_error_result() {
        let (url, requests) = spawn_mock_api(vec![
            tool_use_reply("toolu_9", "does_not_exist", json!({})),
            end_turn_reply("ok"),
        ])
        .await;
        let client = LlmClient::with_api_url("test-key".to_string(), url);
        let agent = Agent::new("Lonely Agent", "system");

        let result = client.run(&agent, "go").await.unwrap();

        assert_eq!(result.tool_calls, 1);
        let requests = requests.lock().unwrap();
        let tool_result = &requests[1]["messages"][2]["content"][0];
        assert_eq!(tool_result["is_error"], true);
        assert!(tool_result["content"]
            .as_str()
            .unwrap()
            .contains("does_not_exist"));
    }

    #[tokio::test]
    async fn test_run_stops_at_turn_limit() {
        let replies = (0..MAX_TURNS)
            .map(|i| tool_use_reply(&format!("toolu_{i}"), "echo", json!({"content": "again"})))
            .collect();
        let (url, requests) = spawn_mock_api(replies).await;
        let client = LlmClient::with_api_url("test-key".to_string(), url);
        let tool = Arc::new(EchoTool {
            calls: Mutex::new(Vec::new()),
        });
        let agent = Agent::new("Loop Agent", "system").with_tool(tool.clone());

        let result = client.run(&agent, "loop").await.unwrap();

        assert_eq!(result.turns, MAX_TURNS);
        assert_eq!(result.stop_reason.as_deref(), Some("max_turns"));
        assert_eq!(tool.calls.lock().unwrap().len(), MAX_TURNS as usize);
        assert_eq!(requests.lock().unwrap().len(), MAX_TURNS as usize);
    }

    #[tokio::test]
    async fn test_client_error_status_is_not_retried() {
        async fn reject(State(hits): State<Arc<Mutex<u32>>>) -> (axum::http::StatusCode, Json<Value>) {
            *hits.lock().unwrap() += 1;
            (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({"type": "error", "error": {"type": "invalid_request_error", "message": "bad tools"}})),
            )
        }

        let hits = Arc::new(Mutex::new(0u32));
        let app = Router::new()
            .route("/v1/messages", post(reject))
            .with_state(hits.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client =
            LlmClient::with_api_url("test-key".to_string(), format!("http://{addr}/v1/messages"));
        let agent = Agent::new("Any Agent", "system");
        let err = client.run(&agent, "go").await.unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad tools");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
