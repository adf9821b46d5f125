//! The provider adapter trait.
//!
//! Adapters self-report identity, capability set, and availability; the
//! orchestrator decides who gets called. Transport failures must be
//! mapped into [`BifrostError`](crate::BifrostError) at this boundary —
//! raw HTTP/client errors never cross it, and retry/fallback decisions
//! are made purely from the error's classification.

use async_trait::async_trait;

use crate::Result;
use crate::limiter::RateLimitStatus;
use crate::types::{AiRequest, AiResponse, Capabilities};

/// A concrete provider integration.
///
/// Implementations may keep their own single-provider concerns
/// (connection pooling, request shaping, provider-side caching) behind
/// `execute`; the orchestrator layers circuit breaking, rate limiting,
/// retries, and cost tracking on top.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider identity, used for circuit/bucket/metrics keys.
    fn name(&self) -> &str;

    /// Which capabilities this provider declares.
    fn capabilities(&self) -> Capabilities;

    /// Whether the provider is usable right now (credentials/config
    /// present). Unavailable providers are skipped during candidate
    /// ordering, not treated as failures.
    fn is_available(&self) -> bool {
        true
    }

    /// Execute a request. May return any [`BifrostError`](crate::BifrostError);
    /// the orchestrator classifies it for retry and fallback.
    async fn execute(&self, request: &AiRequest) -> Result<AiResponse>;

    /// Provider-side rate limit view, when the adapter tracks one.
    fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        None
    }
}
