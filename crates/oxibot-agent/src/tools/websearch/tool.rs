//! `web_search` tool — dispatches to a pluggable backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::registry::{self, WebSearchKeys};
use crate::tools::base::{optional_i64, optional_string, require_string, Tool};

const DEFAULT_COUNT: usize = 5;

/// Searches the web via the auto-selected or explicitly named backend.
pub struct WebSearchTool {
    keys: WebSearchKeys,
}

impl WebSearchTool {
    /// `brave_api_key` is kept as a dedicated parameter for call-site
    /// compatibility with the agent loop's existing wiring; pass richer
    /// key sets via [`WebSearchTool::with_keys`].
    pub fn new(brave_api_key: Option<String>) -> Self {
        Self {
            keys: WebSearchKeys {
                exa_api_key: None,
                brave_api_key,
            },
        }
    }

    pub fn with_keys(keys: WebSearchKeys) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Auto-selects the best available backend (exa, then brave, \
         then a keyless fallback) unless `backend` is given explicitly. Returns a \
         numbered list of results with titles and URLs."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "count": {
                    "type": "integer",
                    "description": "Number of results (1-20, default 5)",
                    "minimum": 1,
                    "maximum": 20
                },
                "backend": {
                    "type": "string",
                    "enum": ["exa", "brave", "ddgs"],
                    "description": "Force a specific backend instead of auto-selecting"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let query = require_string(&params, "query")?;
        let count = optional_i64(&params, "count").unwrap_or(DEFAULT_COUNT as i64).max(1) as usize;
        let backend_name = optional_string(&params, "backend");

        let backend = match backend_name {
            Some(name) => registry::create(&name, &self.keys)
                .ok_or_else(|| anyhow::anyhow!("Unknown web search backend: {name}"))?,
            None => registry::select_auto(&self.keys),
        };

        Ok(backend.search(&query, count).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition() {
        let tool = WebSearchTool::new(None);
        let def = tool.to_definition();
        assert_eq!(def.function.name, "web_search");
    }

    #[tokio::test]
    async fn test_execute_unknown_backend() {
        let tool = WebSearchTool::new(None);
        let mut params = HashMap::new();
        params.insert("query".into(), json!("rust async"));
        params.insert("backend".into(), json!("bing"));
        let result = tool.execute(params).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_execute_missing_query() {
        let tool = WebSearchTool::new(None);
        let result = tool.execute(HashMap::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_execute_forced_ddgs_never_errors_on_config() {
        let tool = WebSearchTool::new(None);
        let mut params = HashMap::new();
        params.insert("query".into(), json!("idempotent"));
        params.insert("backend".into(), json!("ddgs"));
        // ddgs needs no key, so dispatch must succeed regardless of network
        // reachability in this sandbox (search() itself may return an
        // "Error: ..." string on a failed request, but execute() should not).
        let result = tool.execute(params).await;
        assert!(result.is_ok());
    }
}
