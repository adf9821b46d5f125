//! Builder for configuring gateway instances.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
use crate::cache::{CacheConfig, ResponseCache};
use crate::error::{BifrostError, Result};
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::providers::{MockProvider, ProviderAdapter};
use crate::retry::RetryPolicy;
use crate::types::Capability;

use super::unified::{GatewayParts, UnifiedProvider};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Main entry point for creating gateway instances.
pub struct Bifrost;

impl Bifrost {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> BifrostBuilder {
        BifrostBuilder::new()
    }
}

/// Ordered provider chains per capability.
///
/// Each list names providers to try, in order, for that capability. An
/// empty list means "all registered providers, in registration order".
/// Deserializable so hosts can load chains from config files:
///
/// ```toml
/// [fallback]
/// text-generation = ["claude", "gemini"]
/// vision = ["gemini", "claude"]
/// image-generation = ["openai"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FallbackConfig {
    /// Chain for text generation.
    #[serde(default)]
    pub text_generation: Vec<String>,
    /// Chain for image analysis.
    #[serde(default)]
    pub vision: Vec<String>,
    /// Chain for image generation.
    #[serde(default)]
    pub image_generation: Vec<String>,
}

impl FallbackConfig {
    /// Create an empty config (registration order everywhere).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text generation chain.
    pub fn text_generation<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_generation = chain.into_iter().map(Into::into).collect();
        self
    }

    /// Set the vision chain.
    pub fn vision<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vision = chain.into_iter().map(Into::into).collect();
        self
    }

    /// Set the image generation chain.
    pub fn image_generation<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_generation = chain.into_iter().map(Into::into).collect();
        self
    }

    /// The chain configured for a capability.
    pub fn chain_for(&self, capability: Capability) -> &[String] {
        match capability {
            Capability::TextGeneration => &self.text_generation,
            Capability::Vision => &self.vision,
            Capability::ImageGeneration => &self.image_generation,
        }
    }

    fn all_entries(&self) -> impl Iterator<Item = &String> {
        self.text_generation
            .iter()
            .chain(self.vision.iter())
            .chain(self.image_generation.iter())
    }
}

/// Builder for configuring gateway instances.
///
/// ```rust,no_run
/// # use bifrost::{Bifrost, FallbackConfig};
/// # use std::sync::Arc;
/// # fn adapters() -> (Arc<dyn bifrost::ProviderAdapter>, Arc<dyn bifrost::ProviderAdapter>) { unimplemented!() }
/// # fn main() -> bifrost::Result<()> {
/// let (claude, gemini) = adapters();
/// let gateway = Bifrost::builder()
///     .provider(claude)
///     .provider(gemini)
///     .fallback(FallbackConfig::new().text_generation(["claude", "gemini"]))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct BifrostBuilder {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    fallback: FallbackConfig,
    breaker_config: CircuitBreakerConfig,
    rate_limit: RateLimitConfig,
    rate_limit_overrides: Vec<(String, RateLimitConfig)>,
    cache_config: CacheConfig,
    cache_enabled: bool,
    retry: RetryPolicy,
    timeout: Duration,
    mock_fallback: bool,
}

impl BifrostBuilder {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            fallback: FallbackConfig::default(),
            breaker_config: CircuitBreakerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            rate_limit_overrides: Vec::new(),
            cache_config: CacheConfig::default(),
            cache_enabled: true,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            mock_fallback: false,
        }
    }

    /// Register a provider adapter. Registration order is the default
    /// fallback order for capabilities without a configured chain.
    pub fn provider(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Set per-capability fallback chains.
    pub fn fallback(mut self, config: FallbackConfig) -> Self {
        self.fallback = config;
        self
    }

    /// Set circuit breaker thresholds, applied to every provider.
    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    /// Set the default token bucket applied to every provider.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Override the token bucket for one provider.
    pub fn rate_limit_override(
        mut self,
        provider: impl Into<String>,
        config: RateLimitConfig,
    ) -> Self {
        self.rate_limit_overrides.push((provider.into(), config));
        self
    }

    /// Configure the response cache (enabled by default).
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self.cache_enabled = true;
        self
    }

    /// Disable the response cache entirely.
    pub fn disable_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Set the retry policy for provider calls.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the default per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append a deterministic mock provider as the terminal fallback of
    /// every chain. For development environments only.
    pub fn mock_fallback(mut self, enabled: bool) -> Self {
        self.mock_fallback = enabled;
        self
    }

    /// Build the gateway.
    pub fn build(mut self) -> Result<UnifiedProvider> {
        if self.mock_fallback {
            self.adapters.push(Arc::new(MockProvider::new()));
        }

        if self.adapters.is_empty() {
            return Err(BifrostError::Configuration(
                "no providers registered".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for adapter in &self.adapters {
            if !names.insert(adapter.name().to_string()) {
                return Err(BifrostError::Configuration(format!(
                    "duplicate provider name: {}",
                    adapter.name()
                )));
            }
        }

        // Unknown chain entries are skipped at request time; surface them
        // once here so misconfiguration is visible.
        for entry in self.fallback.all_entries() {
            if !names.contains(entry) {
                warn!(provider = %entry, "fallback chain names an unregistered provider");
            }
        }

        let mut limiter = RateLimiter::new(self.rate_limit);
        for (provider, config) in self.rate_limit_overrides {
            limiter = limiter.with_override(provider, config);
        }

        let cache = self
            .cache_enabled
            .then(|| ResponseCache::new(&self.cache_config));

        Ok(UnifiedProvider::new(GatewayParts {
            adapters: self.adapters,
            fallback: self.fallback,
            breakers: CircuitBreakerRegistry::new(self.breaker_config),
            limiter,
            cache,
            retry: self.retry,
            timeout: self.timeout,
            mock_fallback: self.mock_fallback,
        }))
    }
}

impl Default for BifrostBuilder {
    fn default() -> Self {
        Self::new()
    }
}
