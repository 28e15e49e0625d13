//! Process-wide named sub-agent registry.
//!
//! Mirrors the shape of [`oxibot_sandbox::backend`]'s
//! `OnceLock<Mutex<HashMap<...>>>` registry, but — unlike the sandbox
//! backend registry, which silently replaces a duplicate name —
//! `register` here rejects a duplicate outright.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use super::base::AgentConfig;
use super::explore::create_explore_agent;
use super::librarian::create_librarian_agent;

/// Builds an [`AgentConfig`] for a given model override.
pub type AgentFactory = fn(model: Option<String>) -> AgentConfig;

fn registry() -> &'static Mutex<HashMap<String, AgentFactory>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, AgentFactory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<String, AgentFactory> = HashMap::new();
        map.insert("explore".to_string(), create_explore_agent as AgentFactory);
        map.insert("librarian".to_string(), create_librarian_agent as AgentFactory);
        Mutex::new(map)
    })
}

/// Register a new named agent factory. Errors if `name` is already registered.
pub fn register_agent(name: &str, factory: AgentFactory) -> Result<(), String> {
    let mut guard = registry().lock().unwrap();
    if guard.contains_key(name) {
        return Err(format!("Agent '{name}' is already registered"));
    }
    guard.insert(name.to_string(), factory);
    Ok(())
}

/// Build the named agent's config, applying `model` as its override.
/// Errors if `name` is not registered.
pub fn get_agent(name: &str, model: Option<String>) -> Result<AgentConfig, String> {
    let factory = registry()
        .lock()
        .unwrap()
        .get(name)
        .copied()
        .ok_or_else(|| format!("Unknown agent: {name}"))?;
    Ok(factory(model))
}

/// All registered agent names, sorted.
pub fn list_agents() -> Vec<String> {
    let mut names: Vec<String> = registry().lock().unwrap().keys().cloned().collect();
    names.sort();
    names
}

/// Whether an agent name is registered.
pub fn has_agent(name: &str) -> bool {
    registry().lock().unwrap().contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        assert!(has_agent("explore"));
        assert!(has_agent("librarian"));
    }

    #[test]
    fn test_list_agents_sorted() {
        let names = list_agents();
        assert!(names.contains(&"explore".to_string()));
        assert!(names.contains(&"librarian".to_string()));
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_get_unknown_agent_errors() {
        let result = get_agent("nonexistent-agent-xyz", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_get_explore_agent() {
        let cfg = get_agent("explore", None).unwrap();
        assert!(cfg.disabled_tools.contains(&"spawn".to_string()));
    }

    #[test]
    fn test_register_duplicate_name_errors() {
        fn dummy_factory(model: Option<String>) -> AgentConfig {
            AgentConfig::new("dummy", "dummy").with_model(model)
        }
        // "explore" is already registered by default.
        let result = register_agent("explore", dummy_factory);
        assert!(result.is_err());
    }

    #[test]
    fn test_register_new_name_succeeds() {
        fn dummy_factory(model: Option<String>) -> AgentConfig {
            AgentConfig::new("dummy registry test agent", "dummy").with_model(model)
        }
        // Unique name so repeated test runs within the same process don't collide.
        let name = "registry-test-dummy-agent";
        if !has_agent(name) {
            assert!(register_agent(name, dummy_factory).is_ok());
        }
        assert!(has_agent(name));
    }
}
