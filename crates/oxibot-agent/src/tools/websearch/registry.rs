//! Web search backend selection.
//!
//! Unlike the sandbox backend registry (name → constructor, populated
//! once at process init), the three web search backends are cheap value
//! types with no shared mutable state, so this just builds them on demand
//! and picks one by a fixed priority order: `exa → brave → ddgs`.

use super::base::WebSearchBackend;
use super::brave::BraveBackend;
use super::ddgs::DdgsBackend;
use super::exa::ExaBackend;

/// API keys for the keyed backends. `ddgs` needs none.
#[derive(Clone, Debug, Default)]
pub struct WebSearchKeys {
    pub exa_api_key: Option<String>,
    pub brave_api_key: Option<String>,
}

/// Construct a named backend, or `None` if the name is unknown.
pub fn create(name: &str, keys: &WebSearchKeys) -> Option<Box<dyn WebSearchBackend>> {
    match name {
        "exa" => Some(Box::new(ExaBackend::new(keys.exa_api_key.clone()))),
        "brave" => Some(Box::new(BraveBackend::new(keys.brave_api_key.clone()))),
        "ddgs" => Some(Box::new(DdgsBackend::new())),
        _ => None,
    }
}

/// All backend names in priority order.
pub const PRIORITY: &[&str] = &["exa", "brave", "ddgs"];

/// Auto-select the best available backend: `exa → brave → ddgs`.
///
/// `ddgs` requires no configuration and is always available, so this
/// never falls through without a result.
pub fn select_auto(keys: &WebSearchKeys) -> Box<dyn WebSearchBackend> {
    for name in PRIORITY {
        if let Some(backend) = create(name, keys) {
            if backend.is_available() {
                return backend;
            }
        }
    }
    // Unreachable in practice — ddgs::is_available() is always true — but
    // keeps this function total rather than panicking if that ever changes.
    Box::new(DdgsBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_known_names() {
        let keys = WebSearchKeys::default();
        assert!(create("exa", &keys).is_some());
        assert!(create("brave", &keys).is_some());
        assert!(create("ddgs", &keys).is_some());
    }

    #[test]
    fn test_create_unknown_name() {
        let keys = WebSearchKeys::default();
        assert!(create("bing", &keys).is_none());
    }

    #[test]
    fn test_select_auto_prefers_exa() {
        let keys = WebSearchKeys {
            exa_api_key: Some("exa-key".into()),
            brave_api_key: Some("brave-key".into()),
        };
        let backend = select_auto(&keys);
        assert_eq!(backend.name(), "exa");
    }

    #[test]
    fn test_select_auto_falls_back_to_brave() {
        let keys = WebSearchKeys {
            exa_api_key: None,
            brave_api_key: Some("brave-key".into()),
        };
        let backend = select_auto(&keys);
        assert_eq!(backend.name(), "brave");
    }

    #[test]
    fn test_select_auto_falls_back_to_ddgs() {
        let keys = WebSearchKeys::default();
        let backend = select_auto(&keys);
        assert_eq!(backend.name(), "ddgs");
    }
}
