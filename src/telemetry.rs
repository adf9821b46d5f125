//! Telemetry metric name constants.
//!
//! Centralised metric names for bifrost operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `bifrost_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — provider name (e.g. "claude", "gemini")
//! - `capability` — capability invoked ("text-generation", "vision",
//!   "image-generation")
//! - `status` — outcome: "ok" or "error"
//! - `direction` — token direction: "prompt" or "completion"

/// Total requests dispatched through the orchestrator.
///
/// Labels: `provider`, `capability`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "bifrost_requests_total";

/// Request duration in seconds.
///
/// Labels: `provider`, `capability`.
pub const REQUEST_DURATION_SECONDS: &str = "bifrost_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`, `capability`.
pub const RETRIES_TOTAL: &str = "bifrost_retries_total";

/// Total tokens consumed.
///
/// Labels: `provider`, `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "bifrost_tokens_total";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "bifrost_cache_hits_total";

/// Total response cache misses.
pub const CACHE_MISSES_TOTAL: &str = "bifrost_cache_misses_total";

/// Total circuit breaker state transitions.
///
/// Labels: `provider`, `to` ("open" | "half_open" | "closed").
pub const CIRCUIT_TRANSITIONS_TOTAL: &str = "bifrost_circuit_transitions_total";

/// Total rate-limit refusals and server 429s observed.
///
/// Labels: `provider`.
pub const RATE_LIMITED_TOTAL: &str = "bifrost_rate_limited_total";

/// Estimated cost per request in USD.
///
/// Labels: `provider`.
pub const REQUEST_COST_USD: &str = "bifrost_request_cost_usd";
