//! Capability tags and provider capability reporting

use serde::{Deserialize, Serialize};

/// A class of AI operation a provider may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Prompt-in, text-out generation.
    TextGeneration,
    /// Image + prompt in, text out.
    Vision,
    /// Prompt-in, images-out generation.
    ImageGeneration,
}

impl Capability {
    /// Stable string form, used for metric labels and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TextGeneration => "text-generation",
            Capability::Vision => "vision",
            Capability::ImageGeneration => "image-generation",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What capabilities a provider supports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Prompt-in, text-out generation.
    pub text_generation: bool,
    /// Image understanding (vision + text).
    pub vision: bool,
    /// Image generation.
    pub image_generation: bool,
}

impl Capabilities {
    /// Text generation only.
    pub fn text_only() -> Self {
        Self {
            text_generation: true,
            ..Default::default()
        }
    }

    /// Text generation and vision (typical multimodal chat provider).
    pub fn text_and_vision() -> Self {
        Self {
            text_generation: true,
            vision: true,
            ..Default::default()
        }
    }

    /// Image generation only.
    pub fn images_only() -> Self {
        Self {
            image_generation: true,
            ..Default::default()
        }
    }

    /// Full capabilities (all features).
    pub fn full() -> Self {
        Self {
            text_generation: true,
            vision: true,
            image_generation: true,
        }
    }

    /// Whether a specific capability is declared.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::TextGeneration => self.text_generation,
            Capability::Vision => self.vision,
            Capability::ImageGeneration => self.image_generation,
        }
    }

    /// Merge capabilities using OR logic (combines two capability sets).
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            text_generation: self.text_generation || other.text_generation,
            vision: self.vision || other.vision,
            image_generation: self.image_generation || other.image_generation,
        }
    }
}
