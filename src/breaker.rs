//! Per-provider circuit breaking.
//!
//! A breaker trips to `Open` after `failure_threshold` consecutive
//! failures inside `failure_window`, refuses execution for `cooldown`,
//! then admits exactly one probe request (`HalfOpen`). The probe's outcome
//! decides: success closes the circuit, failure reopens it with a fresh
//! cooldown.
//!
//! All state transitions are lazy — evaluated inside `can_execute()` /
//! `status()` when the cooldown is observed to have elapsed, never by a
//! background timer. Callers must go through one of those methods before
//! trusting the state.
//!
//! # Half-open is single-flight
//!
//! Under true parallelism two requests could both observe `HalfOpen` and
//! both probe a still-unhealthy provider. The first `can_execute()` that
//! performs the Open→HalfOpen transition also claims the probe slot, so
//! concurrent checks return false until the probe records an outcome.
//! [`CircuitBreaker::abort_probe`] releases a claimed slot when the caller
//! could not actually issue the probe (e.g. local rate-limit refusal).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::telemetry;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests pass; failures are counted within a sliding window.
    Closed,
    /// Requests are refused until the cooldown elapses.
    Open,
    /// One probe request is allowed through.
    HalfOpen,
}

impl CircuitState {
    fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker thresholds and timings.
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the circuit. Default: 5.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Failures older than this do not compound with fresh ones.
    /// Default: 60s.
    #[serde(default = "default_failure_window")]
    pub failure_window: Duration,
    /// How long the circuit stays open before probing. Default: 30s.
    #[serde(default = "default_cooldown")]
    pub cooldown: Duration,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_failure_window() -> Duration {
    Duration::from_secs(60)
}

fn default_cooldown() -> Duration {
    Duration::from_secs(30)
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            failure_window: default_failure_window(),
            cooldown: default_cooldown(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the consecutive-failure trip threshold.
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n;
        self
    }

    /// Set the sliding failure window.
    pub fn failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    /// Set the open-state cooldown.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Point-in-time snapshot of a breaker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitStatus {
    pub state: CircuitState,
    /// Consecutive failures in the current window.
    pub failures: u32,
    pub last_failure_at: Option<Instant>,
    pub last_success_at: Option<Instant>,
    /// When the circuit last tripped. Set iff it has tripped and not
    /// closed since.
    pub opened_at: Option<Instant>,
    /// `opened_at + cooldown`; set iff `state == Open`.
    pub next_attempt_at: Option<Instant>,
}

struct BreakerInner {
    state: CircuitState,
    failures: u32,
    last_failure_at: Option<Instant>,
    last_success_at: Option<Instant>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl BreakerInner {
    fn fresh() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            last_failure_at: None,
            last_success_at: None,
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

/// Failure-tripped gate for a single provider.
pub struct CircuitBreaker {
    provider: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker for the named provider.
    pub fn new(provider: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            provider: provider.into(),
            config,
            inner: Mutex::new(BreakerInner::fresh()),
        }
    }

    /// Provider this breaker guards.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Lazy Open → HalfOpen transition once the cooldown has elapsed.
    fn advance(&self, inner: &mut BreakerInner, now: Instant) {
        if inner.state == CircuitState::Open
            && let Some(opened_at) = inner.opened_at
            && now.saturating_duration_since(opened_at) >= self.config.cooldown
        {
            inner.state = CircuitState::HalfOpen;
            inner.probe_in_flight = false;
            self.record_transition(CircuitState::HalfOpen);
            debug!(provider = %self.provider, "circuit cooled down, half-open");
        }
    }

    /// Whether a request may be sent to the provider right now.
    ///
    /// In `HalfOpen` this claims the single probe slot — the caller is
    /// expected to issue the request and record its outcome (or call
    /// [`abort_probe`](Self::abort_probe) if it cannot).
    pub fn can_execute(&self) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.advance(&mut inner, now);
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Record a successful call. Closes the circuit and clears the
    /// failure count regardless of current state.
    pub fn record_success(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let was = inner.state;
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.last_success_at = Some(now);
        inner.opened_at = None;
        inner.probe_in_flight = false;
        if was != CircuitState::Closed {
            self.record_transition(CircuitState::Closed);
            debug!(provider = %self.provider, from = was.as_str(), "circuit closed");
        }
    }

    /// Record a failed call.
    ///
    /// A failure outside the failure window resets the counter before
    /// incrementing. A half-open probe failure reopens immediately with a
    /// fresh cooldown.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let stale = inner
            .last_failure_at
            .is_some_and(|at| now.saturating_duration_since(at) > self.config.failure_window);
        if stale {
            inner.failures = 0;
        }
        inner.failures += 1;
        inner.last_failure_at = Some(now);

        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                inner.probe_in_flight = false;
                self.record_transition(CircuitState::Open);
                warn!(provider = %self.provider, "probe failed, circuit reopened");
            }
            CircuitState::Closed if inner.failures >= self.config.failure_threshold => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                self.record_transition(CircuitState::Open);
                warn!(
                    provider = %self.provider,
                    failures = inner.failures,
                    "failure threshold reached, circuit opened"
                );
            }
            _ => {}
        }
    }

    /// Release a probe slot claimed by [`can_execute`](Self::can_execute)
    /// without recording an outcome (the probe was never issued).
    pub fn abort_probe(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    /// Current status snapshot.
    ///
    /// Performs the lazy cooldown transition so the reported state is
    /// accurate, but never claims the probe slot.
    pub fn status(&self) -> CircuitStatus {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.advance(&mut inner, now);
        CircuitStatus {
            state: inner.state,
            failures: inner.failures,
            last_failure_at: inner.last_failure_at,
            last_success_at: inner.last_success_at,
            opened_at: inner.opened_at,
            next_attempt_at: (inner.state == CircuitState::Open)
                .then(|| inner.opened_at.map(|at| at + self.config.cooldown))
                .flatten(),
        }
    }

    /// Manually close the circuit and clear all counters.
    pub fn reset(&self) {
        *self.inner.lock() = BreakerInner::fresh();
        debug!(provider = %self.provider, "circuit manually reset");
    }

    fn record_transition(&self, to: CircuitState) {
        metrics::counter!(telemetry::CIRCUIT_TRANSITIONS_TOTAL,
            "provider" => self.provider.clone(),
            "to" => to.as_str(),
        )
        .increment(1);
    }
}

/// Lazily-populated registry of one breaker per provider identity.
///
/// Breakers are created on first reference and reused for the registry's
/// lifetime.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    /// Create a registry applying `config` to every breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Get (or lazily create) the breaker for a provider.
    pub fn breaker(&self, provider: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().get(provider) {
            return breaker.clone();
        }
        let mut breakers = self.breakers.write();
        breakers
            .entry(provider.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(provider, self.config.clone()))
            })
            .clone()
    }

    /// Manually reset one provider's breaker (no-op if never referenced).
    pub fn reset(&self, provider: &str) {
        if let Some(breaker) = self.breakers.read().get(provider) {
            breaker.reset();
        }
    }

    /// Reset every breaker.
    pub fn reset_all(&self) {
        for breaker in self.breakers.read().values() {
            breaker.reset();
        }
    }

    /// Snapshot of all breakers referenced so far.
    pub fn statuses(&self) -> HashMap<String, CircuitStatus> {
        self.breakers
            .read()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.status()))
            .collect()
    }
}
