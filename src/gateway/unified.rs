//! UnifiedProvider — the orchestrator façade.
//!
//! Composes the circuit breaker registry, rate limiter, response cache,
//! retry executor, and cost tracker around a set of provider adapters.
//! Requests flow one direction: candidate ordering → per-candidate
//! {breaker gate → bucket gate → retried, timed call → outcome
//! recording} → cost tracking → response or aggregated error.
//!
//! The fallback loop is "first success wins, last error wins": a success
//! returns immediately; exhausting all candidates surfaces the last error
//! observed. A non-retryable, non-rate-limit error stops the chain at
//! once — trying another provider cannot fix a bad request.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::breaker::{CircuitBreakerRegistry, CircuitState, CircuitStatus};
use crate::cache::key;
use crate::cache::{CacheStats, ResponseCache};
use crate::cost::{self, AiMetrics, CostTracker, ProviderMetrics};
use crate::error::{BifrostError, Result};
use crate::limiter::{RateLimitStatus, RateLimiter};
use crate::providers::ProviderAdapter;
use crate::retry::{RetryPolicy, with_retry};
use crate::telemetry;
use crate::types::{AiRequest, AiResponse, Capability, GeneratedImage, RequestOptions};

use super::builder::FallbackConfig;

/// Everything the builder wires into a gateway.
pub(crate) struct GatewayParts {
    pub adapters: Vec<Arc<dyn ProviderAdapter>>,
    pub fallback: FallbackConfig,
    pub breakers: CircuitBreakerRegistry,
    pub limiter: RateLimiter,
    pub cache: Option<ResponseCache<AiResponse>>,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub mock_fallback: bool,
}

/// Unified façade over all configured providers.
///
/// Callers request a capability; the gateway picks a working provider,
/// shields the application from sustained failures, reuses cached
/// responses, and degrades gracefully under rate limits — without the
/// caller knowing which provider served them.
pub struct UnifiedProvider {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    fallback: FallbackConfig,
    breakers: CircuitBreakerRegistry,
    limiter: RateLimiter,
    tracker: CostTracker,
    cache: Option<ResponseCache<AiResponse>>,
    retry: RetryPolicy,
    timeout: Duration,
    mock_fallback: bool,
}

impl std::fmt::Debug for UnifiedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedProvider")
            .field("adapters", &self.adapters.len())
            .field("fallback", &self.fallback)
            .field("timeout", &self.timeout)
            .field("mock_fallback", &self.mock_fallback)
            .finish_non_exhaustive()
    }
}

impl UnifiedProvider {
    pub(crate) fn new(parts: GatewayParts) -> Self {
        Self {
            adapters: parts.adapters,
            fallback: parts.fallback,
            breakers: parts.breakers,
            limiter: parts.limiter,
            tracker: CostTracker::new(),
            cache: parts.cache,
            retry: parts.retry,
            timeout: parts.timeout,
            mock_fallback: parts.mock_fallback,
        }
    }

    // ========================================================================
    // Caller façade
    // ========================================================================

    /// Generate text from a prompt.
    pub async fn generate_text(
        &self,
        prompt: impl Into<String>,
        system_prompt: Option<&str>,
        options: RequestOptions,
    ) -> Result<String> {
        let mut request = AiRequest::text(prompt).options(options);
        if let Some(system) = system_prompt {
            request = request.system(system);
        }
        Ok(self.execute_with_fallback(request, None).await?.text)
    }

    /// Analyze an image (as a data URL) with a prompt.
    pub async fn analyze_image(
        &self,
        image_data_url: impl Into<String>,
        prompt: impl Into<String>,
        options: RequestOptions,
    ) -> Result<String> {
        let request = AiRequest::vision(image_data_url, prompt).options(options);
        Ok(self.execute_with_fallback(request, None).await?.text)
    }

    /// Generate images from a prompt.
    pub async fn generate_images(
        &self,
        prompt: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Vec<GeneratedImage>> {
        let request = AiRequest::images(prompt).options(options);
        Ok(self.execute_with_fallback(request, None).await?.images)
    }

    // ========================================================================
    // Fallback chain execution
    // ========================================================================

    /// Execute a request through the fallback chain.
    ///
    /// `preferred` is tried first when it is available and its circuit is
    /// not open; the capability's configured chain follows in declared
    /// order, de-duplicated.
    #[instrument(skip(self, request), fields(capability = %request.capability))]
    pub async fn execute_with_fallback(
        &self,
        request: AiRequest,
        preferred: Option<&str>,
    ) -> Result<AiResponse> {
        let start = Instant::now();
        let capability = request.capability;
        let feature = request.options.feature.clone();

        // Cache probe: a hit bypasses candidate selection entirely.
        let cache_key = self.cache_key(&request);
        if let Some(cache) = self.cache.as_ref()
            && let Some(key) = cache_key.as_deref()
            && let Some(mut hit) = cache.get(key)
        {
            hit.cached = true;
            hit.latency = Duration::ZERO;
            // Cached requests are tracked without usage: the tokens and
            // cost were paid once, when the entry was filled.
            self.tracker.track_request(
                &hit.provider,
                true,
                start.elapsed(),
                None,
                feature.as_deref(),
                true,
            );
            debug!(provider = %hit.provider, "served from cache");
            return Ok(hit);
        }

        let candidates = self.candidates(capability, preferred);
        if candidates.is_empty() {
            Self::record_request(capability, "none", start, false);
            return Err(BifrostError::ProviderUnavailable {
                provider: preferred.map(str::to_string),
            });
        }

        let mut last_err: Option<BifrostError> = None;
        for adapter in candidates {
            let name = adapter.name().to_string();
            let breaker = self.breakers.breaker(&name);

            // Re-check: state may have changed since ordering was computed.
            // In half-open this claims the single probe slot.
            if !breaker.can_execute() {
                debug!(provider = %name, "circuit open, skipping candidate");
                let retry_in = breaker
                    .status()
                    .next_attempt_at
                    .map(|at| at.saturating_duration_since(Instant::now()));
                last_err = Some(BifrostError::CircuitOpen {
                    provider: name,
                    retry_in,
                });
                continue;
            }

            // Local admission control. A refusal is not a provider failure:
            // release the probe slot and move on.
            if !self.limiter.try_acquire(&name) {
                breaker.abort_probe();
                self.tracker.track_rate_limit_hit(&name);
                let status = self.limiter.status(&name);
                debug!(provider = %name, reset_after = ?status.reset_after, "local rate limit, skipping candidate");
                last_err = Some(BifrostError::RateLimited {
                    provider: Some(name),
                    retry_after: Some(status.reset_after),
                });
                continue;
            }

            let call_timeout = request.options.timeout.unwrap_or(self.timeout);
            let attempt_start = Instant::now();
            let result = {
                let adapter = &adapter;
                let request = &request;
                let name = name.as_str();
                with_retry(
                    &self.retry,
                    name,
                    capability.as_str(),
                    |_attempt, err, _delay| {
                        // Fold server cooldowns into our bucket before the
                        // backoff sleep.
                        if err.is_rate_limit() {
                            self.limiter.note_server_cooldown(name, err.retry_after());
                            self.tracker.track_rate_limit_hit(name);
                        }
                    },
                    move || async move {
                        match tokio::time::timeout(call_timeout, adapter.execute(request)).await {
                            Ok(result) => result,
                            Err(_) => Err(BifrostError::Timeout {
                                provider: name.to_string(),
                                elapsed: call_timeout,
                            }),
                        }
                    },
                )
                .await
            };

            let latency = attempt_start.elapsed();
            match result {
                Ok(mut response) => {
                    breaker.record_success();
                    response.provider = name.clone();
                    response.cached = false;
                    response.latency = latency;
                    if let Some(usage) = response.usage.as_mut()
                        && usage.estimated_cost_usd.is_none()
                    {
                        let estimate = cost::estimate_cost(
                            &name,
                            response.model.as_deref(),
                            usage.prompt_tokens,
                            usage.completion_tokens,
                            response.images.len() as u32,
                        );
                        usage.estimated_cost_usd = Some(estimate.total_usd);
                    }
                    self.tracker.track_request(
                        &name,
                        true,
                        latency,
                        response.usage.as_ref(),
                        feature.as_deref(),
                        false,
                    );
                    Self::record_request(capability, &name, start, true);
                    if let Some(cache) = self.cache.as_ref()
                        && let Some(key) = cache_key.as_deref()
                    {
                        match request.options.cache_ttl {
                            Some(ttl) => cache.insert_with_ttl(key, response.clone(), ttl),
                            None => cache.insert(key, response.clone()),
                        }
                    }
                    return Ok(response);
                }
                Err(e) => {
                    breaker.record_failure();
                    self.tracker
                        .track_request(&name, false, latency, None, feature.as_deref(), false);
                    if e.is_rate_limit() {
                        // Final rate-limit failure (retries exhausted or
                        // none configured) still pins the bucket.
                        self.limiter.note_server_cooldown(&name, e.retry_after());
                        self.tracker.track_rate_limit_hit(&name);
                    }
                    warn!(provider = %name, error = %e, "provider failed, falling through");
                    if !e.is_retryable() && !e.is_rate_limit() {
                        // A permanent error will not get better on another
                        // provider's account of the same request.
                        Self::record_request(capability, &name, start, false);
                        return Err(e);
                    }
                    last_err = Some(e);
                }
            }
        }

        Self::record_request(capability, "none", start, false);
        Err(last_err.unwrap_or(BifrostError::ProviderUnavailable {
            provider: preferred.map(str::to_string),
        }))
    }

    // ========================================================================
    // Candidate ordering
    // ========================================================================

    fn adapter_by_name(&self, name: &str) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.iter().find(|a| a.name() == name)
    }

    /// Whether an adapter may be a candidate right now: declares the
    /// capability, reports itself available, and its circuit is not open.
    fn eligible(&self, adapter: &Arc<dyn ProviderAdapter>, capability: Capability) -> bool {
        adapter.capabilities().supports(capability)
            && adapter.is_available()
            && self.breakers.breaker(adapter.name()).status().state != CircuitState::Open
    }

    /// Ordered, de-duplicated candidate list: preferred first, then the
    /// configured chain (or registration order when no chain is set),
    /// with the mock fallback always last.
    fn candidates(
        &self,
        capability: Capability,
        preferred: Option<&str>,
    ) -> Vec<Arc<dyn ProviderAdapter>> {
        let chain = self.fallback.chain_for(capability);
        let mut names: Vec<&str> = Vec::new();
        if let Some(name) = preferred {
            names.push(name);
        }
        if chain.is_empty() {
            names.extend(self.adapters.iter().map(|a| a.name()));
        } else {
            names.extend(chain.iter().map(String::as_str));
            if self.mock_fallback {
                names.push("mock");
            }
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for name in names {
            if !seen.insert(name) {
                continue;
            }
            let Some(adapter) = self.adapter_by_name(name) else {
                continue; // unknown chain entries were warned about at build
            };
            if self.eligible(adapter, capability) {
                out.push(adapter.clone());
            }
        }
        out
    }

    /// Derive the cache key for a request, or `None` when caching does
    /// not apply (disabled, or bypassed per request).
    fn cache_key(&self, request: &AiRequest) -> Option<String> {
        if request.options.no_cache || self.cache.is_none() {
            return None;
        }
        let opts = &request.options;
        let params = key::params_key([
            ("prompt", Some(json!(request.prompt))),
            ("system_prompt", request.system_prompt.as_ref().map(|s| json!(s))),
            ("image", request.image.as_ref().map(|i| json!(i))),
            ("temperature", opts.temperature.map(|t| json!(t))),
            ("max_tokens", opts.max_tokens.map(|m| json!(m))),
            ("image_count", opts.image_count.map(|c| json!(c))),
            ("image_size", opts.image_size.as_ref().map(|s| json!(s))),
        ]);
        Some(key::scoped_key(
            request.capability.as_str(),
            opts.model.as_deref().unwrap_or("default"),
            opts.user_id.as_deref(),
            &[params.as_str()],
        ))
    }

    // ========================================================================
    // Introspection and maintenance
    // ========================================================================

    /// Deep copy of the cost tracker's aggregates.
    pub fn metrics(&self) -> AiMetrics {
        self.tracker.metrics()
    }

    /// Per-provider aggregates, if the provider has served requests.
    pub fn provider_metrics(&self, provider: &str) -> Option<ProviderMetrics> {
        self.tracker.provider_metrics(provider)
    }

    /// One-line human-readable metrics summary.
    pub fn metrics_summary(&self) -> String {
        self.tracker.summary()
    }

    /// Response cache counters; zeroed when caching is disabled.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map(ResponseCache::stats)
            .unwrap_or_default()
    }

    /// Local bucket state for a provider.
    pub fn rate_limit_status(&self, provider: &str) -> RateLimitStatus {
        self.limiter.status(provider)
    }

    /// Snapshot of every circuit breaker referenced so far.
    pub fn circuit_status(&self) -> HashMap<String, CircuitStatus> {
        self.breakers.statuses()
    }

    /// Registered provider names, in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    /// Evict all cached responses.
    pub fn clear_cache(&self) {
        if let Some(cache) = self.cache.as_ref() {
            cache.clear();
        }
    }

    /// Sweep expired cache entries, returning how many were removed.
    pub fn clear_expired_cache(&self) -> usize {
        self.cache
            .as_ref()
            .map(ResponseCache::clear_expired)
            .unwrap_or(0)
    }

    /// Discard all cost/metrics aggregates.
    pub fn reset_metrics(&self) {
        self.tracker.reset();
    }

    /// Manually close one provider's circuit.
    pub fn reset_breaker(&self, provider: &str) {
        self.breakers.reset(provider);
    }

    /// Manually close every circuit.
    pub fn reset_breakers(&self) {
        self.breakers.reset_all();
    }

    /// Record terminal request outcome metrics (counter + histogram).
    fn record_request(capability: Capability, provider: &str, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        let elapsed = start.elapsed().as_secs_f64();
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "provider" => provider.to_owned(),
            "capability" => capability.as_str(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "provider" => provider.to_owned(),
            "capability" => capability.as_str(),
        )
        .record(elapsed);
    }
}
