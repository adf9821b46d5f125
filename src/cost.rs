//! Cost estimation and request metrics.
//!
//! [`estimate_cost`] is a pure lookup against a static pricing table
//! (model-specific overrides falling back to per-provider defaults).
//! [`CostTracker`] accumulates per-request usage, latency, and outcomes
//! into a global rollup plus per-provider aggregates; `track_request` is
//! the sole mutator and is called exactly once per completed request.
//!
//! Token and cost figures are also emitted on the `metrics` facade so an
//! installed recorder sees them without polling the tracker.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::telemetry;
use crate::types::Usage;

// ============================================================================
// Pricing table
// ============================================================================

/// Pricing for one model (or one provider's default), in USD.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelPricing {
    /// Per million input tokens.
    pub input_per_mtok: f64,
    /// Per million output tokens.
    pub output_per_mtok: f64,
    /// Per generated image.
    pub per_image: f64,
}

const fn tok(input_per_mtok: f64, output_per_mtok: f64) -> ModelPricing {
    ModelPricing {
        input_per_mtok,
        output_per_mtok,
        per_image: 0.0,
    }
}

const fn img(per_image: f64) -> ModelPricing {
    ModelPricing {
        input_per_mtok: 0.0,
        output_per_mtok: 0.0,
        per_image,
    }
}

/// Fallback rates per provider when the model is unknown or unlisted.
const PROVIDER_DEFAULTS: &[(&str, ModelPricing)] = &[
    ("claude", tok(3.0, 15.0)),
    ("anthropic", tok(3.0, 15.0)),
    ("gemini", tok(0.3, 2.5)),
    ("google", tok(0.3, 2.5)),
    ("openai", tok(2.5, 10.0)),
    ("mock", tok(0.0, 0.0)),
];

/// Model-specific rates; matched by prefix so dated snapshots
/// ("gpt-4o-2024-11-20") resolve to their family entry.
const MODEL_OVERRIDES: &[(&str, ModelPricing)] = &[
    ("claude-3-5-haiku", tok(0.8, 4.0)),
    ("claude-3-5-sonnet", tok(3.0, 15.0)),
    ("claude-3-opus", tok(15.0, 75.0)),
    ("gemini-1.5-pro", tok(1.25, 10.0)),
    ("gemini-1.5-flash", tok(0.075, 0.3)),
    ("gemini-2.0-flash", tok(0.1, 0.4)),
    ("gpt-4o-mini", tok(0.15, 0.6)),
    ("gpt-4o", tok(2.5, 10.0)),
    ("dall-e-3", img(0.04)),
    ("dall-e-2", img(0.02)),
    ("gpt-image-1", img(0.042)),
];

/// Look up pricing for a provider/model pair.
///
/// Model overrides (prefix match) win over provider defaults; unknown
/// providers price at zero rather than guessing.
pub fn pricing_for(provider: &str, model: Option<&str>) -> ModelPricing {
    if let Some(model) = model
        && let Some((_, pricing)) = MODEL_OVERRIDES
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix))
    {
        return *pricing;
    }
    PROVIDER_DEFAULTS
        .iter()
        .find(|(name, _)| provider.eq_ignore_ascii_case(name))
        .map(|(_, pricing)| *pricing)
        .unwrap_or_default()
}

/// Cost estimate for one request. Pure function of its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    pub provider: String,
    pub model: Option<String>,
    pub input_cost_usd: f64,
    pub output_cost_usd: f64,
    pub image_cost_usd: f64,
    pub total_usd: f64,
}

/// Estimate the cost of a request against the pricing table.
pub fn estimate_cost(
    provider: &str,
    model: Option<&str>,
    input_tokens: u32,
    output_tokens: u32,
    image_count: u32,
) -> CostEstimate {
    let pricing = pricing_for(provider, model);
    let input_cost_usd = input_tokens as f64 / 1_000_000.0 * pricing.input_per_mtok;
    let output_cost_usd = output_tokens as f64 / 1_000_000.0 * pricing.output_per_mtok;
    let image_cost_usd = image_count as f64 * pricing.per_image;
    CostEstimate {
        provider: provider.to_string(),
        model: model.map(str::to_string),
        input_cost_usd,
        output_cost_usd,
        image_cost_usd,
        total_usd: input_cost_usd + output_cost_usd + image_cost_usd,
    }
}

// ============================================================================
// Running aggregates
// ============================================================================

/// Per-provider request aggregates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderMetrics {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub rate_limit_hits: u64,
    pub cache_hits: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Summed, never averaged.
    pub total_cost_usd: f64,
    /// Running mean over this provider's requests.
    pub avg_latency_ms: f64,
}

/// Global rollup plus per-provider and per-feature breakdowns.
#[derive(Debug, Clone, Default)]
pub struct AiMetrics {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub rate_limit_hits: u64,
    pub cache_hits: u64,
    pub total_cost_usd: f64,
    pub avg_latency_ms: f64,
    pub by_provider: HashMap<String, ProviderMetrics>,
    /// Occurrence count per caller-supplied feature label.
    pub by_feature: HashMap<String, u64>,
}

/// Accumulates usage, latency, and outcomes across all providers.
///
/// All reads return deep, independent copies — callers can never mutate
/// tracker state through a returned snapshot.
#[derive(Default)]
pub struct CostTracker {
    inner: Mutex<AiMetrics>,
}

/// Running mean update: `avg = (avg * (n - 1) + sample) / n`.
fn fold_mean(avg: &mut f64, n: u64, sample: f64) {
    debug_assert!(n > 0);
    *avg = (*avg * (n - 1) as f64 + sample) / n as f64;
}

impl CostTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request. The sole aggregate mutator; call
    /// exactly once per request, success or failure.
    pub fn track_request(
        &self,
        provider: &str,
        success: bool,
        latency: Duration,
        usage: Option<&Usage>,
        feature: Option<&str>,
        cached: bool,
    ) {
        let latency_ms = latency.as_secs_f64() * 1000.0;
        let cost = usage.and_then(|u| u.estimated_cost_usd).unwrap_or(0.0);

        let mut inner = self.inner.lock();

        inner.requests += 1;
        if success {
            inner.successes += 1;
        } else {
            inner.failures += 1;
        }
        if cached {
            inner.cache_hits += 1;
        }
        inner.total_cost_usd += cost;
        let n = inner.requests;
        fold_mean(&mut inner.avg_latency_ms, n, latency_ms);

        let by_provider = inner.by_provider.entry(provider.to_string()).or_default();
        by_provider.requests += 1;
        if success {
            by_provider.successes += 1;
        } else {
            by_provider.failures += 1;
        }
        if cached {
            by_provider.cache_hits += 1;
        }
        by_provider.total_cost_usd += cost;
        let n = by_provider.requests;
        fold_mean(&mut by_provider.avg_latency_ms, n, latency_ms);

        if let Some(usage) = usage {
            by_provider.prompt_tokens += u64::from(usage.prompt_tokens);
            by_provider.completion_tokens += u64::from(usage.completion_tokens);
            metrics::counter!(telemetry::TOKENS_TOTAL,
                "provider" => provider.to_owned(),
                "direction" => "prompt",
            )
            .increment(u64::from(usage.prompt_tokens));
            metrics::counter!(telemetry::TOKENS_TOTAL,
                "provider" => provider.to_owned(),
                "direction" => "completion",
            )
            .increment(u64::from(usage.completion_tokens));
        }
        if cost > 0.0 {
            metrics::histogram!(telemetry::REQUEST_COST_USD,
                "provider" => provider.to_owned(),
            )
            .record(cost);
        }

        if let Some(feature) = feature {
            *inner.by_feature.entry(feature.to_string()).or_default() += 1;
        }
    }

    /// Record a rate-limit refusal or server 429 for a provider.
    pub fn track_rate_limit_hit(&self, provider: &str) {
        let mut inner = self.inner.lock();
        inner.rate_limit_hits += 1;
        inner
            .by_provider
            .entry(provider.to_string())
            .or_default()
            .rate_limit_hits += 1;
        metrics::counter!(telemetry::RATE_LIMITED_TOTAL,
            "provider" => provider.to_owned(),
        )
        .increment(1);
    }

    /// Deep copy of all aggregates.
    pub fn metrics(&self) -> AiMetrics {
        self.inner.lock().clone()
    }

    /// Deep copy of one provider's aggregates, if it has been seen.
    pub fn provider_metrics(&self, provider: &str) -> Option<ProviderMetrics> {
        self.inner.lock().by_provider.get(provider).cloned()
    }

    /// Success rate as a percentage, globally or for one provider.
    /// 0.0 when no requests have been recorded.
    pub fn success_rate(&self, provider: Option<&str>) -> f64 {
        let inner = self.inner.lock();
        let (successes, requests) = match provider {
            Some(name) => inner
                .by_provider
                .get(name)
                .map(|p| (p.successes, p.requests))
                .unwrap_or((0, 0)),
            None => (inner.successes, inner.requests),
        };
        if requests == 0 {
            return 0.0;
        }
        successes as f64 / requests as f64 * 100.0
    }

    /// Share of requests served from the cache, as a percentage.
    pub fn cache_hit_rate(&self) -> f64 {
        let inner = self.inner.lock();
        if inner.requests == 0 {
            return 0.0;
        }
        inner.cache_hits as f64 / inner.requests as f64 * 100.0
    }

    /// One-line human-readable summary of the aggregates.
    pub fn summary(&self) -> String {
        let inner = self.inner.lock();
        let success_pct = if inner.requests == 0 {
            0.0
        } else {
            inner.successes as f64 / inner.requests as f64 * 100.0
        };
        let mut providers: Vec<&str> = inner.by_provider.keys().map(String::as_str).collect();
        providers.sort_unstable();
        format!(
            "{} requests ({:.1}% ok, {} cached, {} rate-limited), ${:.4} total, {:.0}ms avg latency, providers: [{}]",
            inner.requests,
            success_pct,
            inner.cache_hits,
            inner.rate_limit_hits,
            inner.total_cost_usd,
            inner.avg_latency_ms,
            providers.join(", "),
        )
    }

    /// Discard all aggregates.
    pub fn reset(&self) {
        *self.inner.lock() = AiMetrics::default();
    }
}
