//! Web search backend trait.
//!

use async_trait::async_trait;

/// A pluggable web search provider.
///
/// Implementations never raise on expected failure conditions (missing
/// API key, network error, empty results) — they return a readable
/// `"Error: ..."` string so the LLM can observe and react, per the
/// tool-error convention shared with every other tool executor.
#[async_trait]
pub trait WebSearchBackend: Send + Sync {
    /// Backend name: `"exa"`, `"brave"`, or `"ddgs"`.
    fn name(&self) -> &str;

    /// Whether this backend is usable right now (API key configured, etc).
    fn is_available(&self) -> bool;

    /// Execute a search, returning a formatted results string.
    async fn search(&self, query: &str, count: usize) -> String;
}
