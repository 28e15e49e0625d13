//! DuckDuckGo HTML backend — free, no API key required.
//!
//! No API key needed: this backend talks to DuckDuckGo's keyless HTML
//! endpoint directly over `reqwest` and extracts results with `regex`,
//! the same pair the rest of this tool module already uses for HTTP +
//! text extraction.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use super::base::WebSearchBackend;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36 (KHTML, like Gecko)";

pub struct DdgsBackend {
    client: Client,
}

impl DdgsBackend {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for DdgsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearchBackend for DdgsBackend {
    fn name(&self) -> &str {
        "ddgs"
    }

    /// Always available: no API key or external dependency required.
    fn is_available(&self) -> bool {
        true
    }

    async fn search(&self, query: &str, count: usize) -> String {
        let n = count.clamp(1, 20);

        let resp = match self
            .client
            .post("https://html.duckduckgo.com/html/")
            .form(&[("q", query)])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return format!("Error: {e}"),
        };

        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => return format!("Error: {e}"),
        };

        let results = parse_results(&body, n);
        if results.is_empty() {
            return format!("No results for: {query}");
        }

        let mut lines = vec![format!("Results for: {query}\n")];
        for (i, (title, url)) in results.iter().enumerate() {
            lines.push(format!("{}. {}\n   {}", i + 1, title, url));
        }
        lines.join("\n")
    }
}

/// Extract `(title, url)` pairs from DuckDuckGo's HTML result markup.
fn parse_results(html: &str, limit: usize) -> Vec<(String, String)> {
    let link_re = Regex::new(
        r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#,
    )
    .expect("valid regex");
    let tag_re = Regex::new(r"<[^>]+>").expect("valid regex");

    link_re
        .captures_iter(html)
        .take(limit)
        .map(|c| {
            let url = decode_ddg_redirect(&c[1]);
            let title = tag_re.replace_all(&c[2], "").trim().to_string();
            (title, url)
        })
        .collect()
}

/// DuckDuckGo's HTML endpoint wraps result links in a redirect
/// (`//duckduckgo.com/l/?uddg=<encoded>&...`); unwrap it to the real URL.
fn decode_ddg_redirect(href: &str) -> String {
    if let Some(idx) = href.find("uddg=") {
        let rest = &href[idx + 5..];
        let encoded = rest.split('&').next().unwrap_or(rest);
        url_decode(encoded)
    } else {
        href.to_string()
    }
}

/// Minimal percent-decoding, sufficient for the query-string fragment above.
fn url_decode(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(bytes[i]);
                i += 1;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_available() {
        assert!(DdgsBackend::new().is_available());
        assert_eq!(DdgsBackend::new().name(), "ddgs");
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("a+b"), "a b");
        assert_eq!(url_decode("https%3A%2F%2Fexample.com%2Fx"), "https://example.com/x");
    }

    #[test]
    fn test_decode_ddg_redirect() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        assert_eq!(decode_ddg_redirect(href), "https://example.com/page");
    }

    #[test]
    fn test_decode_ddg_redirect_passthrough() {
        let href = "https://example.com/direct";
        assert_eq!(decode_ddg_redirect(href), href);
    }

    #[test]
    fn test_parse_results_basic() {
        let html = r#"
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Frust-lang.org%2F">Rust Programming Language</a>
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdocs.rs%2F">docs.rs</a>
        "#;
        let results = parse_results(html, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "Rust Programming Language");
        assert_eq!(results[0].1, "https://rust-lang.org/");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let html = r#"
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.com%2F">A</a>
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fb.com%2F">B</a>
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fc.com%2F">C</a>
        "#;
        let results = parse_results(html, 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_parse_results_empty() {
        assert!(parse_results("<html><body>no results here</body></html>", 5).is_empty());
    }
}
