//! Request types and per-request options

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::capability::Capability;

/// A capability-tagged request, provider-agnostic.
///
/// Built via the constructors ([`AiRequest::text`], [`AiRequest::vision`],
/// [`AiRequest::images`]) and refined with [`RequestOptions`]:
///
/// ```rust
/// # use bifrost::{AiRequest, RequestOptions};
/// let request = AiRequest::text("Summarize this document")
///     .system("You are a concise assistant.")
///     .options(RequestOptions::default().temperature(0.2).user_id("u-42"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRequest {
    /// Which class of operation this request needs.
    pub capability: Capability,
    /// The user prompt.
    pub prompt: String,
    /// Optional system prompt (text/vision capabilities).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Image payload as a data URL (vision capability).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Per-request knobs.
    #[serde(default)]
    pub options: RequestOptions,
}

impl AiRequest {
    /// Create a text generation request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            capability: Capability::TextGeneration,
            prompt: prompt.into(),
            system_prompt: None,
            image: None,
            options: RequestOptions::default(),
        }
    }

    /// Create a vision request over an image data URL.
    pub fn vision(image_data_url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            capability: Capability::Vision,
            prompt: prompt.into(),
            system_prompt: None,
            image: Some(image_data_url.into()),
            options: RequestOptions::default(),
        }
    }

    /// Create an image generation request.
    pub fn images(prompt: impl Into<String>) -> Self {
        Self {
            capability: Capability::ImageGeneration,
            prompt: prompt.into(),
            system_prompt: None,
            image: None,
            options: RequestOptions::default(),
        }
    }

    /// Set the system prompt.
    pub fn system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Replace the request options.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Options for a single request (provider-agnostic).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Requested model; providers map or ignore as appropriate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Number of images to generate (image generation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_count: Option<u32>,
    /// Requested image size, e.g. "1024x1024" (image generation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
    /// Per-request timeout override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Per-request cache TTL override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<Duration>,
    /// Skip the response cache for this request.
    #[serde(default)]
    pub no_cache: bool,
    /// Cache isolation scope. Requests with different user ids never share
    /// cache entries, even for identical content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Free-form feature label for cost attribution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

impl RequestOptions {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn image_count(mut self, count: u32) -> Self {
        self.image_count = Some(count);
        self
    }

    pub fn image_size(mut self, size: impl Into<String>) -> Self {
        self.image_size = Some(size.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn no_cache(mut self, skip: bool) -> Self {
        self.no_cache = skip;
        self
    }

    pub fn user_id(mut self, user: impl Into<String>) -> Self {
        self.user_id = Some(user.into());
        self
    }

    pub fn feature(mut self, label: impl Into<String>) -> Self {
        self.feature = Some(label.into());
        self
    }
}
