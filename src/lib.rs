//! Bifrost - resilient multi-provider client layer for AI APIs
//!
//! This crate mediates all calls from an application to multiple AI
//! providers (text generation, vision, image generation). It picks a
//! working provider for a requested capability, protects the application
//! from sustained provider failures, avoids redundant paid calls, and
//! degrades gracefully under rate limits — without callers needing to
//! know which provider served them.
//!
//! Resilience is layered around provider adapters you register:
//! per-provider circuit breakers, token-bucket rate limiting, an LRU+TTL
//! response cache with per-user isolation, retry with exponential backoff
//! and jitter, and a cost/metrics tracker.
//!
//! # Example
//!
//! ```rust,no_run
//! use bifrost::{Bifrost, FallbackConfig, RequestOptions};
//! # use std::sync::Arc;
//! # fn adapters() -> (Arc<dyn bifrost::ProviderAdapter>, Arc<dyn bifrost::ProviderAdapter>) { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() -> bifrost::Result<()> {
//!     let (claude, gemini) = adapters();
//!     let gateway = Bifrost::builder()
//!         .provider(claude)
//!         .provider(gemini)
//!         .fallback(FallbackConfig::new().text_generation(["claude", "gemini"]))
//!         .build()?;
//!
//!     let text = gateway
//!         .generate_text(
//!             "What is the capital of France?",
//!             Some("You are a helpful assistant."),
//!             RequestOptions::default(),
//!         )
//!         .await?;
//!
//!     println!("{text}");
//!     Ok(())
//! }
//! ```

pub mod breaker;
pub mod cache;
pub mod cost;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod providers;
pub mod retry;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{BifrostError, ErrorCode, Result};
pub use gateway::{Bifrost, BifrostBuilder, FallbackConfig, UnifiedProvider};
pub use providers::{MockProvider, ProviderAdapter};

pub use breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState, CircuitStatus,
};
pub use cache::{CacheConfig, CacheStats, ResponseCache};
pub use cost::{AiMetrics, CostEstimate, CostTracker, ModelPricing, ProviderMetrics, estimate_cost};
pub use limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};
pub use retry::RetryPolicy;

// Re-export all types
pub use types::{
    AiRequest, AiResponse, Capabilities, Capability, GeneratedImage, RequestOptions, Usage,
};
