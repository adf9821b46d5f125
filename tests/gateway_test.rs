//! Integration tests for the gateway façade: builder validation,
//! caller-boundary methods, caching behaviour, and introspection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bifrost::{
    AiRequest, AiResponse, Bifrost, BifrostError, CacheConfig, Capabilities, ErrorCode,
    MockProvider, ProviderAdapter, RequestOptions, Result, RetryPolicy, Usage,
};

/// Counting provider that echoes the prompt.
struct EchoProvider {
    name: &'static str,
    calls: AtomicU32,
}

impl EchoProvider {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicU32::new(0),
        })
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProviderAdapter for EchoProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    async fn execute(&self, request: &AiRequest) -> Result<AiResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(AiResponse {
            text: format!("echo: {}", request.prompt),
            usage: Some(Usage::from_tokens(50, 10)),
            model: Some("echo-1".into()),
            ..Default::default()
        })
    }
}

// ============================================================================
// Builder validation
// ============================================================================

#[test]
fn build_fails_without_providers() {
    let err = Bifrost::builder().build().unwrap_err();
    assert!(matches!(err, BifrostError::Configuration(_)));
}

#[test]
fn build_rejects_duplicate_provider_names() {
    let err = Bifrost::builder()
        .provider(EchoProvider::new("same"))
        .provider(EchoProvider::new("same"))
        .build()
        .unwrap_err();
    assert!(matches!(err, BifrostError::Configuration(_)));
}

#[test]
fn provider_names_in_registration_order() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("first"))
        .provider(EchoProvider::new("second"))
        .build()
        .unwrap();
    assert_eq!(gateway.provider_names(), vec!["first", "second"]);
}

// ============================================================================
// Caller boundary
// ============================================================================

#[tokio::test]
async fn generate_text_returns_text() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("echo"))
        .build()
        .unwrap();

    let text = gateway
        .generate_text("hello", Some("be brief"), RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "echo: hello");
}

#[tokio::test]
async fn analyze_image_returns_text() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("echo"))
        .build()
        .unwrap();

    let text = gateway
        .analyze_image(
            "data:image/png;base64,AAAA",
            "what is this?",
            RequestOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(text, "echo: what is this?");
}

#[tokio::test]
async fn generate_images_returns_images() {
    let gateway = Bifrost::builder()
        .provider(Arc::new(MockProvider::new()))
        .build()
        .unwrap();

    let images = gateway
        .generate_images(
            "three bridges",
            RequestOptions::default().image_count(3),
        )
        .await
        .unwrap();
    assert_eq!(images.len(), 3);
}

// ============================================================================
// Response caching
// ============================================================================

#[tokio::test]
async fn identical_request_served_from_cache() {
    let echo = EchoProvider::new("echo");
    let gateway = Bifrost::builder()
        .provider(echo.clone())
        .cache(CacheConfig::new().default_ttl(Duration::from_secs(60)))
        .build()
        .unwrap();

    let first = gateway
        .execute_with_fallback(AiRequest::text("same prompt"), None)
        .await
        .unwrap();
    assert!(!first.cached);

    let second = gateway
        .execute_with_fallback(AiRequest::text("same prompt"), None)
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.text, first.text);
    assert_eq!(echo.call_count(), 1);

    let stats = gateway.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);

    let metrics = gateway.metrics();
    assert_eq!(metrics.requests, 2);
    assert_eq!(metrics.cache_hits, 1);
}

#[tokio::test]
async fn different_options_miss_the_cache() {
    let echo = EchoProvider::new("echo");
    let gateway = Bifrost::builder().provider(echo.clone()).build().unwrap();

    let options_a = RequestOptions::default().temperature(0.2);
    let options_b = RequestOptions::default().temperature(0.9);
    let _ = gateway
        .execute_with_fallback(AiRequest::text("p").options(options_a), None)
        .await
        .unwrap();
    let _ = gateway
        .execute_with_fallback(AiRequest::text("p").options(options_b), None)
        .await
        .unwrap();

    assert_eq!(echo.call_count(), 2);
}

#[tokio::test]
async fn cache_is_isolated_per_user() {
    let echo = EchoProvider::new("echo");
    let gateway = Bifrost::builder().provider(echo.clone()).build().unwrap();

    for user in ["alice", "bob"] {
        let request = AiRequest::text("shared prompt")
            .options(RequestOptions::default().user_id(user));
        let _ = gateway.execute_with_fallback(request, None).await.unwrap();
    }
    // Identical content, different users: no shared entry.
    assert_eq!(echo.call_count(), 2);

    // Same user again is a hit.
    let request =
        AiRequest::text("shared prompt").options(RequestOptions::default().user_id("alice"));
    let response = gateway.execute_with_fallback(request, None).await.unwrap();
    assert!(response.cached);
    assert_eq!(echo.call_count(), 2);
}

#[tokio::test]
async fn no_cache_option_bypasses_cache() {
    let echo = EchoProvider::new("echo");
    let gateway = Bifrost::builder().provider(echo.clone()).build().unwrap();

    for _ in 0..2 {
        let request =
            AiRequest::text("bypass").options(RequestOptions::default().no_cache(true));
        let _ = gateway.execute_with_fallback(request, None).await.unwrap();
    }
    assert_eq!(echo.call_count(), 2);
}

#[tokio::test]
async fn per_request_ttl_expires_entry() {
    let echo = EchoProvider::new("echo");
    let gateway = Bifrost::builder().provider(echo.clone()).build().unwrap();

    let options = || RequestOptions::default().cache_ttl(Duration::from_millis(30));
    let _ = gateway
        .execute_with_fallback(AiRequest::text("short").options(options()), None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    let response = gateway
        .execute_with_fallback(AiRequest::text("short").options(options()), None)
        .await
        .unwrap();
    assert!(!response.cached);
    assert_eq!(echo.call_count(), 2);
}

#[tokio::test]
async fn clear_cache_forces_refetch() {
    let echo = EchoProvider::new("echo");
    let gateway = Bifrost::builder().provider(echo.clone()).build().unwrap();

    let _ = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap();
    gateway.clear_cache();
    let response = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap();

    assert!(!response.cached);
    assert_eq!(echo.call_count(), 2);
}

#[tokio::test]
async fn disabled_cache_reports_zero_stats() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("echo"))
        .disable_cache()
        .build()
        .unwrap();

    let _ = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap();
    let stats = gateway.cache_stats();
    assert_eq!(stats.hits + stats.misses, 0);
    assert_eq!(stats.max_size, 0);
}

// ============================================================================
// Timeout
// ============================================================================

#[tokio::test]
async fn slow_provider_times_out() {
    let gateway = Bifrost::builder()
        .provider(Arc::new(
            MockProvider::new()
                .named("slow")
                .latency(Duration::from_millis(200)),
        ))
        .retry(RetryPolicy::disabled())
        .disable_cache()
        .build()
        .unwrap();

    let request =
        AiRequest::text("hi").options(RequestOptions::default().timeout(Duration::from_millis(20)));
    let err = gateway.execute_with_fallback(request, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Timeout);
}

// ============================================================================
// Introspection and maintenance
// ============================================================================

#[tokio::test]
async fn usage_gets_cost_estimate_filled_in() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("claude"))
        .disable_cache()
        .build()
        .unwrap();

    let response = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap();
    let usage = response.usage.expect("usage present");
    // 50 prompt + 10 completion tokens at claude default pricing.
    let expected = 50.0 / 1e6 * 3.0 + 10.0 / 1e6 * 15.0;
    assert!((usage.estimated_cost_usd.unwrap() - expected).abs() < 1e-12);

    let metrics = gateway.metrics();
    assert!((metrics.total_cost_usd - expected).abs() < 1e-12);
}

#[tokio::test]
async fn feature_labels_flow_into_metrics() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("echo"))
        .disable_cache()
        .build()
        .unwrap();

    let request =
        AiRequest::text("p").options(RequestOptions::default().feature("summarize"));
    let _ = gateway.execute_with_fallback(request, None).await.unwrap();

    assert_eq!(gateway.metrics().by_feature["summarize"], 1);
}

#[tokio::test]
async fn summary_mentions_provider_and_counts() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("echo"))
        .disable_cache()
        .build()
        .unwrap();

    let _ = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap();

    let summary = gateway.metrics_summary();
    assert!(summary.contains("1 requests"));
    assert!(summary.contains("echo"));
}

#[tokio::test]
async fn reset_metrics_clears_aggregates() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("echo"))
        .disable_cache()
        .build()
        .unwrap();

    let _ = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap();
    gateway.reset_metrics();
    assert_eq!(gateway.metrics().requests, 0);
}

#[tokio::test]
async fn rate_limit_status_visible_per_provider() {
    let gateway = Bifrost::builder()
        .provider(EchoProvider::new("echo"))
        .disable_cache()
        .build()
        .unwrap();

    let before = gateway.rate_limit_status("echo");
    let _ = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap();
    let after = gateway.rate_limit_status("echo");

    assert_eq!(before.limit, after.limit);
    assert!(after.remaining < before.remaining);
}

#[tokio::test]
async fn reset_breaker_reopens_a_tripped_provider() {
    struct AlwaysFails;
    #[async_trait]
    impl ProviderAdapter for AlwaysFails {
        fn name(&self) -> &str {
            "flaky"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::full()
        }
        async fn execute(&self, _request: &AiRequest) -> Result<AiResponse> {
            Err(BifrostError::Network("down".into()))
        }
    }

    let gateway = Bifrost::builder()
        .provider(Arc::new(AlwaysFails))
        .circuit_breaker(
            bifrost::CircuitBreakerConfig::new()
                .failure_threshold(1)
                .cooldown(Duration::from_secs(600)),
        )
        .retry(RetryPolicy::disabled())
        .disable_cache()
        .build()
        .unwrap();

    let _ = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap_err();
    assert_eq!(
        gateway.circuit_status()["flaky"].state,
        bifrost::CircuitState::Open
    );

    // With the only provider's circuit open, candidates are empty.
    let err = gateway
        .execute_with_fallback(AiRequest::text("p"), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProviderUnavailable);

    gateway.reset_breaker("flaky");
    assert_eq!(
        gateway.circuit_status()["flaky"].state,
        bifrost::CircuitState::Closed
    );
}
