use std::time::Duration;

use bifrost::{BifrostError, ErrorCode, Result};

#[test]
fn test_error_display() {
    let err = BifrostError::GenerationFailed("model refused".to_string());
    assert!(err.to_string().contains("model refused"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(BifrostError::ProviderUnavailable { provider: None })
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Retryable classification
// ============================================================================

#[test]
fn retryable_errors() {
    assert!(
        BifrostError::RateLimited {
            provider: None,
            retry_after: None
        }
        .is_retryable()
    );
    assert!(
        BifrostError::RateLimited {
            provider: Some("claude".into()),
            retry_after: Some(Duration::from_secs(1)),
        }
        .is_retryable()
    );
    assert!(
        BifrostError::Timeout {
            provider: "gemini".into(),
            elapsed: Duration::from_secs(30),
        }
        .is_retryable()
    );
    assert!(BifrostError::Network("connection reset".into()).is_retryable());
    assert!(
        BifrostError::Api {
            status: 429,
            message: "too many requests".into()
        }
        .is_retryable()
    );
    for status in [500, 502, 503, 504] {
        assert!(
            BifrostError::Api {
                status,
                message: "upstream".into()
            }
            .is_retryable(),
            "status {status} should be retryable"
        );
    }
}

#[test]
fn permanent_errors() {
    assert!(!BifrostError::ProviderUnavailable { provider: None }.is_retryable());
    assert!(
        !BifrostError::AuthenticationFailed {
            provider: "claude".into()
        }
        .is_retryable()
    );
    assert!(
        !BifrostError::InsufficientQuota {
            provider: "openai".into()
        }
        .is_retryable()
    );
    assert!(!BifrostError::ContentFiltered { reason: "x".into() }.is_retryable());
    assert!(!BifrostError::GenerationFailed("x".into()).is_retryable());
    assert!(!BifrostError::InvalidRequest("x".into()).is_retryable());
    assert!(!BifrostError::Configuration("x".into()).is_retryable());
    assert!(!BifrostError::Unknown("x".into()).is_retryable());
    assert!(
        !BifrostError::CircuitOpen {
            provider: "claude".into(),
            retry_in: None
        }
        .is_retryable()
    );
    for status in [400, 401, 403, 404] {
        assert!(
            !BifrostError::Api {
                status,
                message: "client error".into()
            }
            .is_retryable(),
            "status {status} should be permanent"
        );
    }
}

// ============================================================================
// Code mapping
// ============================================================================

#[test]
fn codes_map_per_variant() {
    assert_eq!(
        BifrostError::ProviderUnavailable { provider: None }.code(),
        ErrorCode::ProviderUnavailable
    );
    assert_eq!(
        BifrostError::Network("x".into()).code(),
        ErrorCode::NetworkError
    );
    assert_eq!(
        BifrostError::CircuitOpen {
            provider: "p".into(),
            retry_in: None
        }
        .code(),
        ErrorCode::CircuitOpen
    );
    assert_eq!(
        BifrostError::Unknown("x".into()).code(),
        ErrorCode::UnknownError
    );
}

#[test]
fn api_status_folds_into_taxonomy() {
    let code = |status| {
        BifrostError::Api {
            status,
            message: String::new(),
        }
        .code()
    };
    assert_eq!(code(429), ErrorCode::RateLimited);
    assert_eq!(code(401), ErrorCode::AuthenticationFailed);
    assert_eq!(code(403), ErrorCode::AuthenticationFailed);
    assert_eq!(code(402), ErrorCode::InsufficientQuota);
    assert_eq!(code(500), ErrorCode::NetworkError);
    assert_eq!(code(400), ErrorCode::InvalidRequest);
}

#[test]
fn rate_limit_detection_covers_api_429() {
    assert!(
        BifrostError::Api {
            status: 429,
            message: String::new()
        }
        .is_rate_limit()
    );
    assert!(
        !BifrostError::Api {
            status: 500,
            message: String::new()
        }
        .is_rate_limit()
    );
}

// ============================================================================
// retry_after extraction
// ============================================================================

#[test]
fn retry_after_from_rate_limited() {
    let duration = Duration::from_secs(5);
    let err = BifrostError::RateLimited {
        provider: None,
        retry_after: Some(duration),
    };
    assert_eq!(err.retry_after(), Some(duration));
}

#[test]
fn retry_after_none_when_not_specified() {
    let err = BifrostError::RateLimited {
        provider: None,
        retry_after: None,
    };
    assert_eq!(err.retry_after(), None);
}

#[test]
fn retry_after_none_for_non_rate_limit_errors() {
    assert_eq!(BifrostError::Network("timeout".into()).retry_after(), None);
    assert_eq!(
        BifrostError::Timeout {
            provider: "p".into(),
            elapsed: Duration::from_secs(1),
        }
        .retry_after(),
        None
    );
}

// ============================================================================
// Provider attribution
// ============================================================================

#[test]
fn provider_attribution() {
    assert_eq!(
        BifrostError::AuthenticationFailed {
            provider: "claude".into()
        }
        .provider(),
        Some("claude")
    );
    assert_eq!(
        BifrostError::RateLimited {
            provider: Some("gemini".into()),
            retry_after: None,
        }
        .provider(),
        Some("gemini")
    );
    assert_eq!(BifrostError::Network("x".into()).provider(), None);
}
