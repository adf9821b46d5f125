//! Bifrost error types

use std::time::Duration;

/// Bifrost error types
#[derive(Debug, thiserror::Error)]
pub enum BifrostError {
    // Provider/network errors
    #[error("no provider available{}", .provider.as_deref().map(|p| format!(" ({p})")).unwrap_or_default())]
    ProviderUnavailable { provider: Option<String> },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: Option<String>,
        retry_after: Option<Duration>,
    },

    #[error("request to {provider} timed out after {elapsed:?}")]
    Timeout { provider: String, elapsed: Duration },

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed for {provider}")]
    AuthenticationFailed { provider: String },

    #[error("insufficient quota for {provider}")]
    InsufficientQuota { provider: String },

    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Raised locally when a provider's circuit is open; the provider was
    /// never contacted. The orchestrator treats this as "try the next
    /// candidate now" — it is never retried against the same provider.
    #[error("circuit open for {provider}, retry in {retry_in:?}")]
    CircuitOpen {
        provider: String,
        retry_in: Option<Duration>,
    },

    // Caller errors
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Stable error classification codes.
///
/// The code, together with [`BifrostError::is_retryable()`], is the sole
/// input to retry, circuit, and fallback decisions — callers never match
/// on provider-specific message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ProviderUnavailable,
    RateLimited,
    Timeout,
    NetworkError,
    InvalidRequest,
    AuthenticationFailed,
    InsufficientQuota,
    ContentFiltered,
    GenerationFailed,
    CircuitOpen,
    UnknownError,
}

impl BifrostError {
    /// Classify this error into a stable [`ErrorCode`].
    ///
    /// Raw API status errors are folded into the taxonomy: 429 is a rate
    /// limit, 401/403 an authentication failure, 402 a quota failure,
    /// 5xx an upstream network-class failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ProviderUnavailable { .. } => ErrorCode::ProviderUnavailable,
            Self::RateLimited { .. } => ErrorCode::RateLimited,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Network(_) => ErrorCode::NetworkError,
            Self::Api { status, .. } => match status {
                429 => ErrorCode::RateLimited,
                401 | 403 => ErrorCode::AuthenticationFailed,
                402 => ErrorCode::InsufficientQuota,
                s if *s >= 500 => ErrorCode::NetworkError,
                _ => ErrorCode::InvalidRequest,
            },
            Self::AuthenticationFailed { .. } => ErrorCode::AuthenticationFailed,
            Self::InsufficientQuota { .. } => ErrorCode::InsufficientQuota,
            Self::ContentFiltered { .. } => ErrorCode::ContentFiltered,
            Self::GenerationFailed(_) => ErrorCode::GenerationFailed,
            Self::CircuitOpen { .. } => ErrorCode::CircuitOpen,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::Configuration(_) | Self::Json(_) | Self::Unknown(_) => ErrorCode::UnknownError,
        }
    }

    /// Whether this error is transient and eligible for automatic retry.
    ///
    /// Retryable: rate limits, timeouts, network failures, and API status
    /// 429 or >= 500. Everything else is permanent — including `Unknown`,
    /// so a misclassifying adapter cannot cause unbounded retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this error is a rate limit (server-reported or local bucket).
    pub fn is_rate_limit(&self) -> bool {
        self.code() == ErrorCode::RateLimited
    }

    /// Extract a server-specified retry-after hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// The provider this error originated from, if known.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderUnavailable { provider } | Self::RateLimited { provider, .. } => {
                provider.as_deref()
            }
            Self::Timeout { provider, .. }
            | Self::AuthenticationFailed { provider }
            | Self::InsufficientQuota { provider }
            | Self::CircuitOpen { provider, .. } => Some(provider),
            _ => None,
        }
    }
}

/// Result type alias for bifrost operations
pub type Result<T> = std::result::Result<T, BifrostError>;
