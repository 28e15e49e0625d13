//! Brave Search API backend.
//!

use async_trait::async_trait;
use reqwest::Client;

use super::base::WebSearchBackend;

pub struct BraveBackend {
    api_key: Option<String>,
    client: Client,
}

impl BraveBackend {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.or_else(|| std::env::var("BRAVE_API_KEY").ok());
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl WebSearchBackend for BraveBackend {
    fn name(&self) -> &str {
        "brave"
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn search(&self, query: &str, count: usize) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return "Error: BRAVE_API_KEY not configured".to_string();
        };
        let n = count.clamp(1, 10);

        let resp = match self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .query(&[("q", query), ("count", &n.to_string())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return format!("Error: {e}"),
        };

        if !resp.status().is_success() {
            let status = resp.status();
            return format!("Error: Brave API returned {status}");
        }

        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => return format!("Error: {e}"),
        };

        let results = body["web"]["results"].as_array().cloned().unwrap_or_default();
        if results.is_empty() {
            return format!("No results for: {query}");
        }

        let mut lines = vec![format!("Results for: {query}\n")];
        for (i, item) in results.iter().take(n).enumerate() {
            let title = item["title"].as_str().unwrap_or("");
            let url = item["url"].as_str().unwrap_or("");
            lines.push(format!("{}. {}\n   {}", i + 1, title, url));
            if let Some(desc) = item["description"].as_str() {
                lines.push(format!("   {desc}"));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_without_key() {
        let backend = BraveBackend::new(None);
        if std::env::var("BRAVE_API_KEY").is_err() {
            assert!(!backend.is_available());
        }
    }

    #[test]
    fn test_available_with_key() {
        let backend = BraveBackend::new(Some("secret".into()));
        assert!(backend.is_available());
        assert_eq!(backend.name(), "brave");
    }

    #[tokio::test]
    async fn test_search_without_key_errors() {
        let backend = BraveBackend { api_key: None, client: Client::new() };
        let result = backend.search("rust", 5).await;
        assert!(result.starts_with("Error:"));
        assert!(result.contains("BRAVE_API_KEY"));
    }
}
