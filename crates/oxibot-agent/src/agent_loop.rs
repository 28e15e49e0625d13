//! Agent loop — the LLM ↔ tool-calling main loop.
//!
//! Receives inbound messages, builds context, calls the LLM, dispatches
//! tool calls, and publishes outbound responses.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info};

use oxibot_core::bus::queue::MessageBus;
use oxibot_core::bus::types::{InboundMessage, OutboundMessage};
use oxibot_core::session::manager::SessionManager;
use oxibot_core::types::{Message, ToolCall};
use oxibot_providers::traits::{LlmProvider, LlmRequestConfig};
use oxibot_sandbox::SandboxManager;

use crate::context::ContextBuilder;
use crate::tools::image::GenerateImageTool;
use crate::tools::message::MessageTool;
use crate::tools::registry::ToolRegistry;
use crate::tools::filesystem::{EditFileTool, ListDirTool, ReadFileTool, WriteFileTool};
use crate::tools::shell::{ExecTool, SandboxExecTool};
use crate::tools::spawn::SpawnTool;
use crate::tools::web::WebFetchTool;
use crate::tools::websearch::{WebSearchKeys, WebSearchTool};

/// Default maximum LLM ↔ tool iterations per user message.
const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Configuration for the exec tool.
#[derive(Clone, Debug)]
pub struct ExecToolConfig {
    /// Timeout in seconds (default 60).
    pub timeout: u64,
}

impl Default for ExecToolConfig {
    fn default() -> Self {
        Self { timeout: 60 }
    }
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

/// The main agent loop: polls the message bus, calls the LLM, dispatches tools.
pub struct AgentLoop {
    /// Message bus for inbound/outbound messages.
    bus: Arc<MessageBus>,
    /// LLM provider.
    provider: Arc<dyn LlmProvider>,
    /// Workspace root.
    workspace: PathBuf,
    /// Model to use (overrides provider default if set).
    model: String,
    /// Max LLM ↔ tool iterations per message.
    max_iterations: usize,
    /// LLM request config (temperature, max_tokens).
    request_config: LlmRequestConfig,
    /// Tool registry.
    tools: ToolRegistry,
    /// Context builder.
    context: ContextBuilder,
    /// Session manager.
    sessions: SessionManager,
    /// Reference to the message tool (for set_context).
    message_tool: Arc<MessageTool>,
    /// Reference to the sandbox exec tool, when sandboxing is enabled
    /// (for set_context). `None` means the host [`ExecTool`] is in use.
    sandbox_tool: Option<Arc<SandboxExecTool>>,
}

impl AgentLoop {
    /// Create a new agent loop.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Arc<MessageBus>,
        provider: Arc<dyn LlmProvider>,
        workspace: PathBuf,
        model: Option<String>,
        max_iterations: Option<usize>,
        request_config: Option<LlmRequestConfig>,
        brave_api_key: Option<String>,
        exec_config: Option<ExecToolConfig>,
        restrict_to_workspace: bool,
        session_manager: Option<SessionManager>,
        agent_name: Option<String>,
    ) -> Self {
        Self::with_extra_keys(
            bus,
            provider,
            workspace,
            model,
            max_iterations,
            request_config,
            brave_api_key,
            None,
            exec_config,
            restrict_to_workspace,
            session_manager,
            agent_name,
            None,
            None,
        )
    }

    /// Create a new agent loop with an Exa search key, image tool
    /// configuration, and/or a sandbox manager on top of
    /// [`AgentLoop::new`]'s parameters.
    ///
    /// When `sandbox_manager` is `Some`, [`SandboxExecTool`] replaces the
    /// host [`ExecTool`] under the `exec` tool name, so every command runs
    /// inside the calling session's sandbox instead of directly on the
    /// gateway host.
    #[allow(clippy::too_many_arguments)]
    pub fn with_extra_keys(
        bus: Arc<MessageBus>,
        provider: Arc<dyn LlmProvider>,
        workspace: PathBuf,
        model: Option<String>,
        max_iterations: Option<usize>,
        request_config: Option<LlmRequestConfig>,
        brave_api_key: Option<String>,
        exa_api_key: Option<String>,
        exec_config: Option<ExecToolConfig>,
        restrict_to_workspace: bool,
        session_manager: Option<SessionManager>,
        agent_name: Option<String>,
        image_config: Option<crate::tools::image::ImageToolConfig>,
        sandbox_manager: Option<Arc<SandboxManager>>,
    ) -> Self {
        let model = model.unwrap_or_else(|| provider.default_model().to_string());
        let max_iterations = max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let request_config = request_config.unwrap_or_default();
        let exec_config = exec_config.unwrap_or_default();
        let agent_name = agent_name.unwrap_or_else(|| "Oxibot".into());
        let sessions =
            session_manager.unwrap_or_else(|| SessionManager::new(None).expect("failed to create session manager"));

        let context = ContextBuilder::new(&workspace, &agent_name);

        // Build tool registry
        let mut tools = ToolRegistry::new();
        let allowed_dir = if restrict_to_workspace {
            Some(workspace.clone())
        } else {
            None
        };

        tools.register(Arc::new(ReadFileTool::new(allowed_dir.clone())));
        tools.register(Arc::new(WriteFileTool::new(allowed_dir.clone())));
        tools.register(Arc::new(EditFileTool::new(allowed_dir.clone())));
        tools.register(Arc::new(ListDirTool::new(allowed_dir)));

        let sandbox_tool = sandbox_manager.map(|manager| {
            Arc::new(SandboxExecTool::new(manager, exec_config.timeout))
        });
        match &sandbox_tool {
            Some(tool) => tools.register(tool.clone()),
            None => tools.register(Arc::new(ExecTool::new(
                workspace.clone(),
                Some(exec_config.timeout),
                restrict_to_workspace,
            ))),
        }

        tools.register(Arc::new(WebSearchTool::with_keys(WebSearchKeys {
            exa_api_key,
            brave_api_key,
        })));
        tools.register(Arc::new(WebFetchTool::new()));

        if let Some(image_config) = image_config {
            tools.register(Arc::new(GenerateImageTool::new(image_config)));
        }

        let message_tool = Arc::new(MessageTool::new(None));
        tools.register(message_tool.clone());

        // The spawn tool gets its own filtered view of this registry per
        // sub-agent call (see `ToolRegistry::filtered`), built from the
        // full set registered above — it must be constructed last so its
        // snapshot includes every other tool.
        let spawn_tool = Arc::new(
            SpawnTool::new(Arc::new(tools.clone()), provider.clone(), model.clone())
                .with_request_config(request_config.clone()),
        );
        tools.register(spawn_tool);

        info!(
            model = %model,
            tools = tools.len(),
            max_iterations = max_iterations,
            "agent loop initialized"
        );

        Self {
            bus,
            provider,
            workspace,
            model,
            max_iterations,
            request_config,
            tools,
            context,
            sessions,
            message_tool,
            sandbox_tool,
        }
    }

    /// Run the event loop: poll inbound messages and process them.
    ///
    /// This runs indefinitely until the inbound channel is closed.
    pub async fn run(&self) {
        info!("agent loop started, waiting for messages");
        loop {
            match self.bus.consume_inbound().await {
                Some(msg) => {
                    let session_key = msg.session_key();
                    debug!(session_key = %session_key, "received message");

                    // Route system messages (from subagents) vs regular messages
                    let result = if msg.channel == "system" && msg.sender_id == "subagent" {
                        self.process_system_message(&msg).await
                    } else {
                        self.process_message(&msg).await
                    };

                    match result {
                        Ok(response) => {
                            if let Err(e) = self.bus.publish_outbound(response).await {
                                error!(error = %e, "failed to publish outbound message");
                            }
                        }
                        Err(e) => {
                            error!(error = %e, session_key = %session_key, "message processing error");
                            let err_msg = OutboundMessage::new(
                                &msg.channel,
                                &msg.chat_id,
                                &format!("I encountered an error: {e}"),
                            );
                            let _ = self.bus.publish_outbound(err_msg).await;
                        }
                    }
                }
                None => {
                    info!("inbound channel closed, agent loop exiting");
                    break;
                }
            }
        }
    }

    /// Process a single inbound message → outbound response.
    ///
    /// This is the core agent logic:
    /// 1. Get/create session, load history
    /// 2. Build context messages
    /// 3. LLM ↔ tool loop
    /// 4. Save session, return response
    pub async fn process_message(&self, msg: &InboundMessage) -> Result<OutboundMessage> {
        let session_key = msg.session_key();

        // Set message tool context for this conversation. The `spawn` tool
        // shares this registry's `Arc<MessageTool>`, so a sub-agent that
        // calls `message` picks up the same context without its own state.
        self.message_tool
            .set_context(&msg.channel, &msg.chat_id)
            .await;
        if let Some(sandbox_tool) = &self.sandbox_tool {
            sandbox_tool.set_context(&msg.channel, &msg.chat_id).await;
        }

        // A fresh token for this run; `SessionManager::delete` cancels it.
        let cancellation = self.sessions.cancellation_token(&session_key);

        // Get session history
        let history = self.sessions.get_history(&session_key, 50);

        // Build LLM messages
        let media_paths: Vec<String> = msg.media.iter().map(|m| m.path.clone()).collect();
        let mut messages = self.context.build_messages(
            &history,
            &msg.content,
            &media_paths,
            &msg.channel,
            &msg.chat_id,
        );

        // Get tool definitions
        let tool_defs = self.tools.get_definitions();

        // Agent loop: LLM ↔ tool calling
        let mut final_content: Option<String> = None;
        let mut cancelled = false;

        for iteration in 0..self.max_iterations {
            if cancellation.is_cancelled() {
                info!(session_key = %session_key, iteration = iteration, "loop cancelled before LLM call");
                cancelled = true;
                break;
            }

            debug!(iteration = iteration, "LLM call");

            let response = self
                .provider
                .chat(
                    &messages,
                    Some(&tool_defs),
                    &self.model,
                    &self.request_config,
                )
                .await;

            if response.has_tool_calls() {
                // Add assistant message with tool calls
                let tool_calls: Vec<ToolCall> = response.tool_calls.clone();
                ContextBuilder::add_assistant_message(
                    &mut messages,
                    response.content.clone(),
                    tool_calls.clone(),
                );

                // Execute each tool call
                for tc in &tool_calls {
                    let params: HashMap<String, serde_json::Value> =
                        serde_json::from_str(&tc.function.arguments).unwrap_or_default();

                    info!(
                        tool = %tc.function.name,
                        iteration = iteration,
                        "executing tool call"
                    );

                    let result = self.tools.execute(&tc.function.name, params).await;

                    debug!(
                        tool = %tc.function.name,
                        result_len = result.len(),
                        "tool result"
                    );

                    ContextBuilder::add_tool_result(&mut messages, &tc.id, &result);

                    if cancellation.is_cancelled() {
                        info!(session_key = %session_key, "loop cancelled after tool execution, abandoning remaining tool calls");
                        cancelled = true;
                        break;
                    }
                }
                if cancelled {
                    break;
                }
            } else {
                // No tool calls → final answer
                final_content = response.content;
                break;
            }
        }

        // If cancelled, unrecoverable, or we exhausted iterations without a
        // final answer, fall back to a single user-visible message.
        let content = if cancelled {
            final_content.unwrap_or_else(|| {
                "This conversation was cancelled before I could finish responding.".into()
            })
        } else {
            final_content
                .unwrap_or_else(|| "I've completed processing but have no response to give.".into())
        };

        // Save conversation to session
        self.sessions
            .add_message(&session_key, Message::user(&msg.content));
        self.sessions
            .add_message(&session_key, Message::assistant(&content));

        Ok(OutboundMessage::new(&msg.channel, &msg.chat_id, &content))
    }

    /// Process a system message (from a subagent or cron).
    ///
    /// Parses the original `channel:chat_id` from `msg.chat_id`,
    /// loads the original session, runs a full LLM call to summarize
    /// the result, and routes the response back to the correct channel.
    async fn process_system_message(&self, msg: &InboundMessage) -> Result<OutboundMessage> {
        info!(
            sender = %msg.sender_id,
            chat_id = %msg.chat_id,
            "processing system message"
        );

        // Parse origin from chat_id format "channel:chat_id"
        let (origin_channel, origin_chat_id) = match msg.chat_id.split_once(':') {
            Some((ch, cid)) => (ch.to_string(), cid.to_string()),
            None => {
                return Err(anyhow::anyhow!(
                    "Invalid system message chat_id format: {}",
                    msg.chat_id
                ));
            }
        };

        let session_key = format!("{origin_channel}:{origin_chat_id}");

        // Set tools context to the original channel/chat
        self.message_tool
            .set_context(&origin_channel, &origin_chat_id)
            .await;
        if let Some(sandbox_tool) = &self.sandbox_tool {
            sandbox_tool
                .set_context(&origin_channel, &origin_chat_id)
                .await;
        }

        // Load the original session
        let history = self.sessions.get_history(&session_key, 50);

        // Build messages with the subagent result as the "user" message
        let mut messages =
            self.context
                .build_messages(&history, &msg.content, &[], &origin_channel, &origin_chat_id);

        let tool_defs = self.tools.get_definitions();
        let mut final_content: Option<String> = None;

        for iteration in 0..self.max_iterations {
            debug!(iteration = iteration, "system message LLM call");

            let response = self
                .provider
                .chat(&messages, Some(&tool_defs), &self.model, &self.request_config)
                .await;

            if response.has_tool_calls() {
                let tool_calls: Vec<ToolCall> = response.tool_calls.clone();
                ContextBuilder::add_assistant_message(
                    &mut messages,
                    response.content.clone(),
                    tool_calls.clone(),
                );

                for tc in &tool_calls {
                    let params: HashMap<String, serde_json::Value> =
                        serde_json::from_str(&tc.function.arguments).unwrap_or_default();
                    let result = self.tools.execute(&tc.function.name, params).await;
                    ContextBuilder::add_tool_result(&mut messages, &tc.id, &result);
                }
            } else {
                final_content = response.content;
                break;
            }
        }

        let content = final_content
            .unwrap_or_else(|| "I've completed processing but have no response to give.".into());

        // Save to the original session
        self.sessions
            .add_message(&session_key, Message::user(&msg.content));
        self.sessions
            .add_message(&session_key, Message::assistant(&content));

        // Route response to the original channel/chat
        Ok(OutboundMessage::new(
            &origin_channel,
            &origin_chat_id,
            &content,
        ))
    }

    /// Direct processing mode (CLI entry point).
    ///
    /// Wraps text into an `InboundMessage` on the "cli" channel and processes.
    pub async fn process_direct(&self, text: &str) -> Result<String> {
        let msg = InboundMessage::new("cli", "user", "direct", text);
        let response = self.process_message(&msg).await?;
        Ok(response.content)
    }

    /// Get a reference to the tool registry (for testing/extension).
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
