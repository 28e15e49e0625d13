//! `generate_image` — text-to-image, image edit, and variation via an
//! OpenAI-compatible images API.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, warn};

use super::base::{optional_i64, optional_string, Tool};

/// Configuration for [`GenerateImageTool`].
#[derive(Clone, Debug)]
pub struct ImageToolConfig {
    /// Model identifier passed to the images API.
    pub model: String,
    /// API key. Empty means unauthenticated (or provided via a proxy).
    pub api_key: String,
    /// Base URL of an OpenAI-compatible images API, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
}

// ─────────────────────────────────────────────
// GenerateImageTool
// ─────────────────────────────────────────────

/// Generates images from scratch, edits an existing image, or creates a
/// variation of one. Never raises: every failure path returns an
/// `"Error ...: ..."`-prefixed string for the LLM to read.
pub struct GenerateImageTool {
    config: ImageToolConfig,
    client: Client,
}

impl GenerateImageTool {
    pub fn new(config: ImageToolConfig) -> Self {
        Self {
            config,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Resolve a `base_image`/`mask` parameter (data URI, raw base64, or URL)
    /// into raw bytes, downloading first if it's a URL.
    async fn resolve_image_bytes(&self, raw: &str) -> anyhow::Result<Vec<u8>> {
        if let Some(idx) = raw.find(',') {
            if raw.starts_with("data:") {
                let header = &raw[..idx];
                let data = &raw[idx + 1..];
                return if header.contains(";base64") {
                    base64::engine::general_purpose::STANDARD
                        .decode(data)
                        .map_err(|e| anyhow::anyhow!("invalid base64 data URI: {e}"))
                } else {
                    Ok(data.as_bytes().to_vec())
                };
            }
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            let resp = self
                .client
                .get(raw)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("failed to download image: {e}"))?;
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| anyhow::anyhow!("failed to read downloaded image: {e}"))?;
            return Ok(bytes.to_vec());
        }

        base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(|e| anyhow::anyhow!("invalid base64 image data: {e}"))
    }

    fn resolve_api_key(&self) -> String {
        if !self.config.api_key.is_empty() {
            return self.config.api_key.clone();
        }
        std::env::var("OPENAI_API_KEY").unwrap_or_default()
    }

    async fn generate(&self, prompt: &str, size: &str, quality: &str, style: &str, n: i64) -> anyhow::Result<Vec<String>> {
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "size": size,
            "quality": quality,
            "style": style,
            "n": n,
        });

        let url = format!("{}/images/generations", self.config.api_base.trim_end_matches('/'));
        let mut req = self.client.post(&url).json(&body);
        let key = self.resolve_api_key();
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| anyhow::anyhow!("request failed: {e}"))?;
        self.extract_images(resp).await
    }

    async fn edit_or_variation(
        &self,
        endpoint: &str,
        base_image: &[u8],
        mask: Option<&[u8]>,
        prompt: Option<&str>,
        size: &str,
        n: i64,
    ) -> anyhow::Result<Vec<String>> {
        let mut form = reqwest::multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("size", size.to_string())
            .text("n", n.to_string())
            .part("image", reqwest::multipart::Part::bytes(base_image.to_vec()).file_name("image.png"));

        if let Some(p) = prompt {
            form = form.text("prompt", p.to_string());
        }
        if let Some(m) = mask {
            form = form.part("mask", reqwest::multipart::Part::bytes(m.to_vec()).file_name("mask.png"));
        }

        let url = format!("{}/{endpoint}", self.config.api_base.trim_end_matches('/'));
        let mut req = self.client.post(&url).multipart(form);
        let key = self.resolve_api_key();
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| anyhow::anyhow!("request failed: {e}"))?;
        self.extract_images(resp).await
    }

    async fn extract_images(&self, resp: reqwest::Response) -> anyhow::Result<Vec<String>> {
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("failed to parse response: {e}"))?;

        if !status.is_success() {
            let msg = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            anyhow::bail!("API returned {status}: {msg}");
        }

        let mut images = Vec::new();
        if let Some(data) = body.get("data").and_then(|d| d.as_array()) {
            for item in data {
                if let Some(b64) = item.get("b64_json").and_then(|v| v.as_str()) {
                    images.push(b64.to_string());
                } else if let Some(url) = item.get("url").and_then(|v| v.as_str()) {
                    let bytes = self.resolve_image_bytes(url).await?;
                    images.push(base64::engine::general_purpose::STANDARD.encode(bytes));
                }
            }
        }
        Ok(images)
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "Generate images from scratch, edit existing images, or create variations. \
         For edit/variation mode, provide a base_image (base64 or URL)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "mode": {
                    "type": "string",
                    "enum": ["generate", "edit", "variation"],
                    "description": "Mode: 'generate' (from scratch), 'edit' (edit existing), or 'variation' (create variations)",
                    "default": "generate"
                },
                "prompt": {
                    "type": "string",
                    "description": "Text description of the image (required for generate and edit modes)"
                },
                "base_image": {
                    "type": "string",
                    "description": "Base image for edit/variation mode: base64 data URI, raw base64, or image URL"
                },
                "mask": {
                    "type": "string",
                    "description": "Mask image for edit mode: transparent areas indicate where to edit"
                },
                "size": {
                    "type": "string",
                    "enum": ["1024x1024", "1792x1024", "1024x1792", "1920x1920"],
                    "default": "1920x1920"
                },
                "quality": {
                    "type": "string",
                    "enum": ["standard", "hd"],
                    "default": "standard"
                },
                "style": {
                    "type": "string",
                    "enum": ["vivid", "natural"],
                    "default": "vivid"
                },
                "n": {
                    "type": "integer",
                    "description": "Number of images to generate (1-4)",
                    "minimum": 1,
                    "maximum": 4,
                    "default": 1
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let mode = optional_string(&params, "mode").unwrap_or_else(|| "generate".to_string());
        let prompt = optional_string(&params, "prompt");
        let base_image = optional_string(&params, "base_image");
        let mask = optional_string(&params, "mask");
        let size = optional_string(&params, "size").unwrap_or_else(|| "1920x1920".to_string());
        let quality = optional_string(&params, "quality").unwrap_or_else(|| "standard".to_string());
        let style = optional_string(&params, "style").unwrap_or_else(|| "vivid".to_string());
        let n = optional_i64(&params, "n").unwrap_or(1).clamp(1, 4);

        if (mode == "edit" || mode == "variation") && base_image.is_none() {
            return Ok(format!("Error: base_image is required for {mode} mode"));
        }
        if (mode == "generate" || mode == "edit") && prompt.is_none() {
            return Ok(format!("Error: prompt is required for {mode} mode"));
        }

        let result = match mode.as_str() {
            "generate" => self.generate(prompt.as_deref().unwrap(), &size, &quality, &style, n).await,
            "edit" => {
                let bytes = self.resolve_image_bytes(base_image.as_deref().unwrap()).await;
                match bytes {
                    Ok(bytes) => {
                        let mask_bytes = match mask {
                            Some(ref m) => Some(self.resolve_image_bytes(m).await?),
                            None => None,
                        };
                        self.edit_or_variation(
                            "images/edits",
                            &bytes,
                            mask_bytes.as_deref(),
                            prompt.as_deref(),
                            &size,
                            n,
                        )
                        .await
                    }
                    Err(e) => Err(e),
                }
            }
            "variation" => match self.resolve_image_bytes(base_image.as_deref().unwrap()).await {
                Ok(bytes) => self.edit_or_variation("images/variations", &bytes, None, None, &size, n).await,
                Err(e) => Err(e),
            },
            other => return Ok(format!("Error: Unknown mode '{other}'")),
        };

        match result {
            Ok(images) if images.is_empty() => Ok("Error: No images generated".to_string()),
            Ok(images) => {
                let lines: Vec<String> = images
                    .into_iter()
                    .map(|img| format!("data:image/png;base64,{img}"))
                    .collect();
                Ok(lines.join("\n\n"))
            }
            Err(e) => {
                error!(error = %e, mode = %mode, "image generation failed");
                warn!("returning error string to LLM instead of propagating");
                Ok(format!("Error generating image: {e}"))
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
