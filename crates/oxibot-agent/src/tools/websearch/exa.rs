//! Exa AI search backend.
//!

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::base::WebSearchBackend;

pub struct ExaBackend {
    api_key: Option<String>,
    client: Client,
}

impl ExaBackend {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.or_else(|| std::env::var("EXA_API_KEY").ok());
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl WebSearchBackend for ExaBackend {
    fn name(&self) -> &str {
        "exa"
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn search(&self, query: &str, count: usize) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return "Error: EXA_API_KEY not configured".to_string();
        };
        let n = count.clamp(1, 20);

        let resp = match self
            .client
            .post("https://api.exa.ai/search")
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .header("x-api-key", api_key)
            .json(&json!({
                "query": query,
                "type": "auto",
                "numResults": n,
                "contents": {"text": true, "livecrawl": "fallback"},
            }))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return format!("Error: {e}"),
        };

        if !resp.status().is_success() {
            let status = resp.status();
            return format!("Error: Exa API returned {status}");
        }

        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => return format!("Error: {e}"),
        };

        let results = body["results"].as_array().cloned().unwrap_or_default();
        if results.is_empty() {
            return format!("No results for: {query}");
        }

        let mut lines = vec![format!("Results for: {query}\n")];
        for (i, item) in results.iter().take(n).enumerate() {
            let title = item["title"].as_str().unwrap_or("");
            let url = item["url"].as_str().unwrap_or("");
            lines.push(format!("{}. {}\n   {}", i + 1, title, url));
            if let Some(text) = item["text"].as_str() {
                let snippet: String = text.chars().take(500).collect();
                lines.push(format!("   {snippet}..."));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_with_key() {
        let backend = ExaBackend::new(Some("secret".into()));
        assert!(backend.is_available());
        assert_eq!(backend.name(), "exa");
    }

    #[tokio::test]
    async fn test_search_without_key_errors() {
        let backend = ExaBackend { api_key: None, client: Client::new() };
        let result = backend.search("rust", 5).await;
        assert!(result.starts_with("Error:"));
        assert!(result.contains("EXA_API_KEY"));
    }
}
