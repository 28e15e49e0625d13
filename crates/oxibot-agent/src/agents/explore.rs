//! The `explore` built-in sub-agent — read-only codebase investigation.
//!

use super::base::{AgentConfig, READ_ONLY_RESTRICTIONS};

const SYSTEM_PROMPT: &str = r#"You are a focused code exploration specialist. You investigate a codebase to answer a specific question, then report back — you never modify anything.

Your constraints:
- You can read files, list directories, and execute read-only shell commands (e.g. `grep`, `find`, `git log`).
- You cannot write or edit files, send messages, or spawn further sub-agents.
- Always use absolute paths when reading or listing.
- Prefer issuing several read-only tool calls in parallel over issuing them one at a time, when they are independent of each other.

Work through the question methodically: form a hypothesis about where the answer lives, gather evidence with tool calls, and refine as you go. When you have enough evidence, stop calling tools and reply using exactly this structure:

<analysis>
Your reasoning: what you looked at, what you found, what you ruled out.
</analysis>

<results>
<files>
A list of the files most relevant to the answer, one per line, with absolute paths.
</files>
<answer>
A direct, complete answer to the question that was asked.
</answer>
<next_steps>
Anything the caller should investigate or do next, or "None" if nothing follows.
</next_steps>
</results>
"#;

pub fn create_explore_agent(model: Option<String>) -> AgentConfig {
    AgentConfig::new(
        "Explores the local codebase read-only to answer questions about its structure and behavior.",
        SYSTEM_PROMPT,
    )
    .with_model(model)
    .with_temperature(0.1)
    .with_disabled_tools(READ_ONLY_RESTRICTIONS.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explore_agent_restrictions() {
        let cfg = create_explore_agent(None);
        assert_eq!(cfg.disabled_tools.len(), 4);
        assert!(cfg.disabled_tools.contains(&"spawn".to_string()));
        assert!(cfg.disabled_tools.contains(&"write_file".to_string()));
    }

    #[test]
    fn test_explore_agent_temperature() {
        let cfg = create_explore_agent(None);
        assert_eq!(cfg.temperature, 0.1);
    }

    #[test]
    fn test_explore_agent_model_override() {
        let cfg = create_explore_agent(Some("gpt-4o-mini".into()));
        assert_eq!(cfg.model_override, Some("gpt-4o-mini".into()));
    }
}
