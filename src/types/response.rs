//! Response and usage types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A provider response, normalized across capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiResponse {
    /// Text content (text generation, vision analysis).
    #[serde(default)]
    pub text: String,
    /// Generated images (image generation).
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
    /// Name of the provider that served this response.
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Whether this response was served from the cache.
    #[serde(default)]
    pub cached: bool,
    /// Wall-clock latency of the serving call (zero for cache hits).
    #[serde(default)]
    pub latency: Duration,
}

/// A single generated image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Base64 payload or data URL, as produced by the provider adapter.
    pub data: String,
    /// MIME type, e.g. "image/png".
    pub mime_type: String,
}

/// Token usage statistics attached to a response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Estimated cost in USD; filled from the pricing table when the
    /// adapter does not report it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost_usd: Option<f64>,
    /// Raw provider usage payload, for callers that need provider detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Usage {
    /// Create usage from token counts; `total_tokens` is derived.
    pub fn from_tokens(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated_cost_usd: None,
            raw: None,
        }
    }
}
