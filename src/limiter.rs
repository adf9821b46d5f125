//! Per-provider token-bucket rate limiting.
//!
//! One bucket per provider, refilled continuously at `limit / window`.
//! [`RateLimiter::try_acquire`] is non-blocking admission control: it
//! consumes one token if available and refuses otherwise. A
//! server-reported cooldown ([`RateLimiter::note_server_cooldown`]) zeroes
//! the bucket and suspends refill until the cooldown elapses — a refill
//! tick can never shorten a server cooldown.
//!
//! Buckets are created lazily on first reference, from the default
//! [`RateLimitConfig`] or a per-provider override.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;

/// Token bucket parameters for one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity, and tokens restored per window. Default: 60.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Refill window. Default: 60s.
    #[serde(default = "default_window")]
    pub window: Duration,
}

fn default_limit() -> u32 {
    60
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window: default_window(),
        }
    }
}

impl RateLimitConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket capacity per window.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the refill window.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Read projection of a provider's bucket state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitStatus {
    /// Whole tokens currently available.
    pub remaining: u32,
    /// Bucket capacity.
    pub limit: u32,
    /// Time until the bucket is fully refilled (zero when already full).
    pub reset_after: Duration,
    /// True iff no token is available right now.
    pub limited: bool,
}

struct TokenBucket {
    limit: u32,
    window: Duration,
    /// Fractional tokens available; refilled lazily on access.
    available: f64,
    refreshed_at: Instant,
    /// Refill is suspended until this instant (server-reported cooldown).
    cooldown_until: Option<Instant>,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        Self {
            limit: config.limit,
            window: config.window,
            available: config.limit as f64,
            refreshed_at: Instant::now(),
            cooldown_until: None,
        }
    }

    /// Refill rate in tokens per second.
    fn rate(&self) -> f64 {
        self.limit as f64 / self.window.as_secs_f64().max(f64::EPSILON)
    }

    /// Lazily refill up to capacity, honoring an active cooldown.
    fn refill(&mut self, now: Instant) {
        if let Some(until) = self.cooldown_until {
            if now < until {
                // No refill while the server cooldown is active.
                self.refreshed_at = now;
                return;
            }
            // Cooldown elapsed; refill resumes from its end.
            self.refreshed_at = until;
            self.cooldown_until = None;
        }
        let elapsed = now.saturating_duration_since(self.refreshed_at);
        self.available =
            (self.available + elapsed.as_secs_f64() * self.rate()).min(self.limit as f64);
        self.refreshed_at = now;
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.available >= 1.0 {
            self.available -= 1.0;
            true
        } else {
            false
        }
    }

    fn status(&mut self, now: Instant) -> RateLimitStatus {
        self.refill(now);
        let remaining = self.available.floor() as u32;
        let missing = self.limit as f64 - self.available;
        let natural = Duration::from_secs_f64(missing / self.rate());
        // During a cooldown the bucket refills only after the cooldown
        // ends, so full recovery is cooldown + a whole window.
        let reset_after = match self.cooldown_until {
            Some(until) if now < until => until.saturating_duration_since(now) + self.window,
            _ => natural,
        };
        RateLimitStatus {
            remaining,
            limit: self.limit,
            reset_after,
            limited: remaining == 0,
        }
    }

    fn note_cooldown(&mut self, now: Instant, retry_after: Duration) {
        self.available = 0.0;
        let until = now + retry_after;
        // Only ever extend; a shorter hint cannot cut an existing cooldown.
        if self.cooldown_until.is_none_or(|existing| until > existing) {
            self.cooldown_until = Some(until);
        }
        self.refreshed_at = now;
    }
}

/// Per-provider token-bucket admission control.
pub struct RateLimiter {
    default_config: RateLimitConfig,
    overrides: HashMap<String, RateLimitConfig>,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    /// Create a limiter with one default configuration for all providers.
    pub fn new(default_config: RateLimitConfig) -> Self {
        Self {
            default_config,
            overrides: HashMap::new(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Add a per-provider configuration override.
    ///
    /// Only affects buckets not yet created; call during wiring.
    pub fn with_override(mut self, provider: impl Into<String>, config: RateLimitConfig) -> Self {
        self.overrides.insert(provider.into(), config);
        self
    }

    fn config_for(&self, provider: &str) -> &RateLimitConfig {
        self.overrides.get(provider).unwrap_or(&self.default_config)
    }

    /// Consume one token for `provider` if available. Never blocks.
    pub fn try_acquire(&self, provider: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::new(self.config_for(provider)));
        bucket.try_acquire(now)
    }

    /// Current bucket state for `provider` (creates the bucket if absent).
    pub fn status(&self, provider: &str) -> RateLimitStatus {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::new(self.config_for(provider)));
        bucket.status(now)
    }

    /// Fold a server-reported cooldown into the bucket.
    ///
    /// Zeroes available tokens and suspends refill for `retry_after`
    /// (one full window when the server gave no hint). The cooldown can
    /// only extend the reset horizon, never shorten it.
    pub fn note_server_cooldown(&self, provider: &str, retry_after: Option<Duration>) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let config = self.config_for(provider);
        let window = config.window;
        let bucket = buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::new(config));
        bucket.note_cooldown(now, retry_after.unwrap_or(window));
    }

    /// Providers with a bucket instantiated so far.
    pub fn known_providers(&self) -> Vec<String> {
        self.buckets.lock().keys().cloned().collect()
    }
}
