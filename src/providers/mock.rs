//! Deterministic in-process provider for development environments.

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;
use crate::types::{AiRequest, AiResponse, Capabilities, Capability, GeneratedImage, Usage};

use super::traits::ProviderAdapter;

/// A 1x1 transparent PNG, base64-encoded. Stable placeholder payload for
/// generated images.
const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Deterministic adapter declaring every capability.
///
/// Intended as the terminal fallback in non-production environments
/// (enabled via the builder's `mock_fallback`); responses are synthesized
/// locally, cost nothing, and never fail.
pub struct MockProvider {
    name: String,
    /// Simulated latency per call, for exercising timeout paths in tests.
    latency: Duration,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            latency: Duration::ZERO,
        }
    }
}

impl MockProvider {
    /// Create a mock provider named "mock" with zero latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the provider name (useful when wiring several mocks).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add simulated latency to every call.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    async fn execute(&self, request: &AiRequest) -> Result<AiResponse> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut response = AiResponse {
            provider: self.name.clone(),
            model: Some(format!("{}-local", self.name)),
            usage: Some(Usage::from_tokens(
                request.prompt.len() as u32 / 4,
                32,
            )),
            ..Default::default()
        };

        match request.capability {
            Capability::TextGeneration => {
                response.text = format!("[{}] {}", self.name, synthesize_reply(&request.prompt));
            }
            Capability::Vision => {
                response.text = format!(
                    "[{}] The image could not be analyzed offline; prompt was: {}",
                    self.name, request.prompt
                );
            }
            Capability::ImageGeneration => {
                let count = request.options.image_count.unwrap_or(1).max(1);
                response.images = (0..count)
                    .map(|_| GeneratedImage {
                        data: PLACEHOLDER_PNG.to_string(),
                        mime_type: "image/png".to_string(),
                    })
                    .collect();
            }
        }

        Ok(response)
    }
}

/// Deterministic canned reply keyed off the prompt, so tests and demos
/// get stable output.
fn synthesize_reply(prompt: &str) -> String {
    let excerpt: String = prompt.chars().take(80).collect();
    format!("(offline response) {excerpt}")
}
