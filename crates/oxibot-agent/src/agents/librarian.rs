//! The `librarian` built-in sub-agent — external web research.
//!

use super::base::{AgentConfig, READ_ONLY_RESTRICTIONS};

const SYSTEM_PROMPT: &str = r#"You are a research specialist. You answer a question using the public web, then report back — you never modify the workspace or message the user directly.

Your constraints:
- You can search the web and fetch page content.
- You cannot write or edit files, send messages, or spawn further sub-agents.
- Cross-check claims across more than one source where the question's stakes warrant it. Prefer primary sources over aggregators.

Work through the question methodically: search broadly first, then fetch the most promising pages for detail, then refine your search if gaps remain. When you have enough to answer, stop calling tools and reply using exactly this structure:

<results>
<sources>
A list of the URLs you drew on, one per line.
</sources>
<answer>
A direct, complete answer to the question that was asked.
</answer>
<next_steps>
Anything the caller should investigate or do next, or "None" if nothing follows.
</next_steps>
</results>
"#;

pub fn create_librarian_agent(model: Option<String>) -> AgentConfig {
    AgentConfig::new(
        "Researches a question on the public web and returns a sourced answer.",
        SYSTEM_PROMPT,
    )
    .with_model(model)
    .with_temperature(0.3)
    .with_disabled_tools(READ_ONLY_RESTRICTIONS.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_librarian_agent_restrictions() {
        let cfg = create_librarian_agent(None);
        assert!(cfg.disabled_tools.contains(&"message".to_string()));
    }

    #[test]
    fn test_librarian_agent_temperature() {
        let cfg = create_librarian_agent(None);
        assert_eq!(cfg.temperature, 0.3);
    }
}
