//! The `AgentConfig` type sub-agents are described by.
//!
//! Only the fields that shape sub-agent *execution* are kept here —
//! prompt-routing metadata (category, cost, trigger phrases) for a UI
//! that picks a sub-agent from a menu has no counterpart in this crate.

/// Whether an [`AgentConfig`] can run as the top-level conversational
/// agent, or only as a tool a primary agent dispatches to via `spawn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentMode {
    Primary,
    Subagent,
}

/// A named, reusable agent configuration: its own system prompt,
/// sampling settings, and tool restrictions.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub description: String,
    pub mode: AgentMode,
    /// Overrides the caller's model when set; inherits it otherwise.
    pub model_override: Option<String>,
    pub temperature: f32,
    pub system_prompt: String,
    /// Tool names this agent may not call, even if the parent registry has them.
    pub disabled_tools: Vec<String>,
}

impl AgentConfig {
    pub fn new(description: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            mode: AgentMode::Subagent,
            model_override: None,
            temperature: 0.7,
            system_prompt: system_prompt.into(),
            disabled_tools: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model_override = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_disabled_tools(mut self, disabled_tools: Vec<&str>) -> Self {
        self.disabled_tools = disabled_tools.into_iter().map(String::from).collect();
        self
    }
}

/// The standard restriction set applied to every built-in sub-agent:
/// they read and research, but never write, message, or spawn further
/// sub-agents.
pub const READ_ONLY_RESTRICTIONS: &[&str] = &["write_file", "edit_file", "message", "spawn"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_builder() {
        let cfg = AgentConfig::new("test agent", "you are a test agent")
            .with_temperature(0.2)
            .with_disabled_tools(READ_ONLY_RESTRICTIONS.to_vec());
        assert_eq!(cfg.temperature, 0.2);
        assert_eq!(cfg.disabled_tools.len(), 4);
        assert!(cfg.disabled_tools.contains(&"spawn".to_string()));
    }

    #[test]
    fn test_default_mode_is_subagent() {
        let cfg = AgentConfig::new("x", "y");
        assert_eq!(cfg.mode, AgentMode::Subagent);
    }
}
