//! Spawn tool — run a named sub-agent to completion and return its answer.
//!
//! Dispatches to a config from the [`crate::agents`] registry: builds a
//! filtered tool registry (full tool set minus the agent's
//! `disabled_tools`), runs a bounded LLM ↔ tool loop with an ephemeral,
//! non-persisted message history, and returns the specialist's final
//! answer directly as the tool result — there is no "task started, I'll
//! notify you" confirmation step.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use oxibot_core::types::{Message, ToolCall};
use oxibot_providers::traits::{LlmProvider, LlmRequestConfig};

use super::base::{require_string, Tool};
use super::registry::ToolRegistry;
use crate::agents;
use crate::context::ContextBuilder;

/// Default iteration budget for a sub-agent run — deliberately smaller
/// than the primary agent loop's default, since sub-agents answer one
/// focused question rather than carry a whole conversation.
const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Tool that dispatches to a named sub-agent and blocks for its answer.
pub struct SpawnTool {
    /// The parent's full tool set, filtered per sub-agent via `disabled_tools`.
    tools: Arc<ToolRegistry>,
    provider: Arc<dyn LlmProvider>,
    default_model: String,
    request_config: LlmRequestConfig,
    max_iterations: usize,
}

impl SpawnTool {
    pub fn new(tools: Arc<ToolRegistry>, provider: Arc<dyn LlmProvider>, default_model: String) -> Self {
        Self {
            tools,
            provider,
            default_model,
            request_config: LlmRequestConfig::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_request_config(mut self, config: LlmRequestConfig) -> Self {
        self.request_config = config;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

#[async_trait]
impl Tool for SpawnTool {
    fn name(&self) -> &str {
        "spawn"
    }

    fn description(&self) -> &str {
        "Dispatch a focused task to a named specialist sub-agent and wait for its \
         answer. Use `explore` to investigate the local codebase read-only, or \
         `librarian` to research a question on the public web. Returns the \
         specialist's final answer directly."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_name": {
                    "type": "string",
                    "description": "The registered sub-agent to dispatch to (e.g. \"explore\", \"librarian\")"
                },
                "prompt": {
                    "type": "string",
                    "description": "The task or question to hand to the sub-agent"
                }
            },
            "required": ["agent_name", "prompt"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let agent_name = require_string(&params, "agent_name")?;
        let prompt = require_string(&params, "prompt")?;

        let config = agents::get_agent(&agent_name, None).map_err(|e| anyhow::anyhow!(e))?;
        let model = config
            .model_override
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let request_config = LlmRequestConfig {
            temperature: config.temperature as f64,
            ..self.request_config.clone()
        };

        let restricted_tools = self.tools.filtered(&config.disabled_tools);

        info!(
            agent = %agent_name,
            tools = restricted_tools.len(),
            "running sub-agent"
        );

        let mut messages = vec![
            Message::system(config.system_prompt.clone()),
            Message::user(&prompt),
        ];
        let tool_defs = restricted_tools.get_definitions();

        let mut final_content: Option<String> = None;

        for iteration in 0..self.max_iterations {
            debug!(agent = %agent_name, iteration = iteration, "sub-agent LLM call");

            let response = self
                .provider
                .chat(&messages, Some(&tool_defs), &model, &request_config)
                .await;

            if response.has_tool_calls() {
                let tool_calls: Vec<ToolCall> = response.tool_calls.clone();
                ContextBuilder::add_assistant_message(
                    &mut messages,
                    response.content.clone(),
                    tool_calls.clone(),
                );

                for tc in &tool_calls {
                    let call_params: HashMap<String, Value> =
                        serde_json::from_str(&tc.function.arguments).unwrap_or_default();
                    let result = restricted_tools.execute(&tc.function.name, call_params).await;
                    ContextBuilder::add_tool_result(&mut messages, &tc.id, &result);
                }
            } else {
                final_content = response.content;
                break;
            }
        }

        Ok(final_content.unwrap_or_else(|| {
            format!("Sub-agent '{agent_name}' did not produce a final answer within its iteration budget.")
        }))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oxibot_core::types::{LlmResponse, ToolDefinition};

    struct MockProvider {
        responses: std::sync::Mutex<Vec<LlmResponse>>,
    }

    impl MockProvider {
        fn simple(text: &str) -> Self {
            Self {
                responses: std::sync::Mutex::new(vec![LlmResponse {
                    content: Some(text.into()),
                    ..Default::default()
                }]),
            }
        }

        fn sequence(responses: Vec<LlmResponse>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn chat(
            &self,
            _messages: &[Message],
            _tools: Option<&[ToolDefinition]>,
            _model: &str,
            _config: &LlmRequestConfig,
        ) -> LlmResponse {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                LlmResponse::default()
            } else {
                responses.remove(0)
            }
        }

        fn default_model(&self) -> &str {
            "mock"
        }

        fn display_name(&self) -> &str {
            "Mock"
        }
    }

    fn create_test_spawn_tool(provider: Arc<dyn LlmProvider>) -> SpawnTool {
        SpawnTool::new(Arc::new(ToolRegistry::new()), provider, "mock-model".into())
    }

    #[test]
    fn test_spawn_tool_name() {
        let tool = create_test_spawn_tool(Arc::new(MockProvider::simple("ok")));
        assert_eq!(tool.name(), "spawn");
    }

    #[test]
    fn test_spawn_tool_parameters_schema() {
        let tool = create_test_spawn_tool(Arc::new(MockProvider::simple("ok")));
        let params = tool.parameters();
        let required = params["required"].as_array().unwrap();
        assert!(required.contains(&json!("agent_name")));
        assert!(required.contains(&json!("prompt")));
    }

    #[tokio::test]
    async fn test_execute_unknown_agent_errors() {
        let tool = create_test_spawn_tool(Arc::new(MockProvider::simple("ok")));
        let mut params = HashMap::new();
        params.insert("agent_name".into(), json!("not-a-real-agent"));
        params.insert("prompt".into(), json!("do something"));
        let result = tool.execute(params).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown agent"));
    }

    #[tokio::test]
    async fn test_execute_missing_params() {
        let tool = create_test_spawn_tool(Arc::new(MockProvider::simple("ok")));
        let mut params = HashMap::new();
        params.insert("agent_name".into(), json!("explore"));
        let result = tool.execute(params).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_execute_explore_returns_final_answer() {
        let provider = Arc::new(MockProvider::simple(
            "<results><files>none</files><answer>42</answer><next_steps>None</next_steps></results>",
        ));
        let tool = create_test_spawn_tool(provider);

        let mut params = HashMap::new();
        params.insert("agent_name".into(), json!("explore"));
        params.insert("prompt".into(), json!("what is the answer?"));

        let result = tool.execute(params).await.unwrap();
        assert!(result.contains("<answer>42</answer>"));
    }

    #[tokio::test]
    async fn test_execute_exhausts_iterations_gracefully() {
        let tool_call = ToolCall::new("call_loop", "read_file", r#"{"path": "/tmp/x"}"#);
        let responses: Vec<LlmResponse> = (0..20)
            .map(|_| LlmResponse {
                content: None,
                tool_calls: vec![tool_call.clone()],
                ..Default::default()
            })
            .collect();
        let provider = Arc::new(MockProvider::sequence(responses));
        let tool = create_test_spawn_tool(provider);

        let mut params = HashMap::new();
        params.insert("agent_name".into(), json!("explore"));
        params.insert("prompt".into(), json!("loop forever"));

        let result = tool.execute(params).await.unwrap();
        assert!(result.contains("did not produce a final answer"));
    }
}
