//! Integration tests driving the middleware through an axum router.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, body::Body, routing::get};
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use bucket_ratelimit::{
    BackendError, FailurePolicy, InMemoryRateLimiter, KeySource, RateLimitContext,
    RateLimiterBackend, RouteRateLimit, middleware::RateLimitLayer,
};

async fn handler() -> &'static str {
    "ok"
}

fn app(limit: u64, window: Duration) -> Router {
    let route = RouteRateLimit::builder()
        .limit(limit)
        .window(window)
        .build()
        .unwrap();
    Router::new()
        .route("/", get(handler))
        .layer(RateLimitLayer::new(InMemoryRateLimiter::new(), route))
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_five_requests_then_rejection() {
    let app = app(5, Duration::from_secs(60));

    for expected_remaining in ["4", "3", "2", "1", "0"] {
        let response = send(&app, get_request("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "X-RateLimit-Limit"), "5");
        assert_eq!(
            header(&response, "X-RateLimit-Remaining"),
            expected_remaining
        );
        assert!(response.headers().get("Retry-After").is_none());
    }

    let response = send(&app, get_request("/")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "X-RateLimit-Remaining"), "0");
    assert_eq!(
        header(&response, "Retry-After"),
        header(&response, "X-RateLimit-Reset-After"),
        "Retry-After must equal the integer-second Reset-After"
    );
}

#[tokio::test]
async fn test_rejection_body_shape() {
    let app = app(1, Duration::from_secs(60));

    send(&app, get_request("/")).await;
    let response = send(&app, get_request("/")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "content-type"), "application/json");

    let retry_after: u64 = header(&response, "Retry-After").parse().unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["message"], "You are being rate limited.");
    assert_eq!(body["retry_after"], retry_after);
    assert_eq!(body["global"], false);
}

#[tokio::test]
async fn test_window_reset_restores_budget() {
    let app = app(3, Duration::from_millis(300));

    for _ in 0..3 {
        let response = send(&app, get_request("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = send(&app, get_request("/")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let response = send(&app, get_request("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "X-RateLimit-Remaining"), "2");
}

#[tokio::test]
async fn test_precision_header_selects_rendering() {
    let app = app(5, Duration::from_secs(60));

    let response = send(&app, get_request("/")).await;
    let reset = header(&response, "X-RateLimit-Reset");
    let reset_after = header(&response, "X-RateLimit-Reset-After");
    assert!(!reset.contains('.'), "default rendering is integer seconds");
    assert!(!reset_after.contains('.'));

    let request = Request::builder()
        .uri("/")
        .header("X-RateLimit-Precision", "millisecond")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert!(header(&response, "X-RateLimit-Reset").contains('.'));
    assert!(header(&response, "X-RateLimit-Reset-After").contains('.'));
}

#[tokio::test]
async fn test_retry_after_is_integer_even_with_millisecond_precision() {
    let app = app(1, Duration::from_secs(60));

    send(&app, get_request("/")).await;
    let request = Request::builder()
        .uri("/")
        .header("X-RateLimit-Precision", "millisecond")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(!header(&response, "Retry-After").contains('.'));
    assert!(header(&response, "X-RateLimit-Reset-After").contains('.'));
}

#[tokio::test]
async fn test_bucket_header_is_stable_per_route() {
    let app = app(5, Duration::from_secs(60));

    let first = send(&app, get_request("/")).await;
    let second = send(&app, get_request("/")).await;
    assert_eq!(
        header(&first, "X-RateLimit-Bucket"),
        header(&second, "X-RateLimit-Bucket")
    );
}

#[tokio::test]
async fn test_routes_consume_independent_buckets() {
    // Same backend, two mounted routes: their random route keys keep the
    // buckets apart even for an identical caller.
    let backend = Arc::new(InMemoryRateLimiter::new());
    let make = |limit| {
        RouteRateLimit::builder()
            .limit(limit)
            .window(Duration::from_secs(60))
            .build()
            .unwrap()
    };
    let app = Router::new()
        .route(
            "/a",
            get(handler).layer(RateLimitLayer::with_shared_backend(backend.clone(), make(1))),
        )
        .route(
            "/b",
            get(handler).layer(RateLimitLayer::with_shared_backend(backend.clone(), make(2))),
        );

    let a1 = send(&app, get_request("/a")).await;
    let b1 = send(&app, get_request("/b")).await;
    assert_eq!(a1.status(), StatusCode::OK);
    assert_eq!(b1.status(), StatusCode::OK);
    assert_ne!(
        header(&a1, "X-RateLimit-Bucket"),
        header(&b1, "X-RateLimit-Bucket")
    );

    // Exhausting /a leaves /b untouched.
    let a2 = send(&app, get_request("/a")).await;
    let b2 = send(&app, get_request("/b")).await;
    assert_eq!(a2.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(b2.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_additional_key_splits_buckets() {
    let route = RouteRateLimit::builder()
        .limit(1)
        .window(Duration::from_secs(60))
        .additional_key(KeySource::Header("x-guild-id".into()))
        .build()
        .unwrap();
    let app = Router::new()
        .route("/", get(handler))
        .layer(RateLimitLayer::new(InMemoryRateLimiter::new(), route));

    let with_guild = |guild: &str| {
        Request::builder()
            .uri("/")
            .header("x-guild-id", guild)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&app, with_guild("1")).await.status(), StatusCode::OK);
    assert_eq!(
        send(&app, with_guild("2")).await.status(),
        StatusCode::OK,
        "a different sub-resource has its own budget"
    );
    assert_eq!(
        send(&app, with_guild("1")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_caller_key_splits_buckets() {
    let route = RouteRateLimit::builder()
        .limit(1)
        .window(Duration::from_secs(60))
        .caller_key(KeySource::Header("x-api-key".into()))
        .build()
        .unwrap();
    let app = Router::new()
        .route("/", get(handler))
        .layer(RateLimitLayer::new(InMemoryRateLimiter::new(), route));

    let as_caller = |key: &str| {
        Request::builder()
            .uri("/")
            .header("x-api-key", key)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&app, as_caller("alice")).await.status(), StatusCode::OK);
    assert_eq!(send(&app, as_caller("bob")).await.status(), StatusCode::OK);
    assert_eq!(
        send(&app, as_caller("alice")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

/// A backend that always fails, standing in for an unreachable store.
#[derive(Clone)]
struct FailingBackend;

impl RateLimiterBackend for FailingBackend {
    async fn handle(
        &self,
        _ctx: &RateLimitContext,
        _bucket: &str,
    ) -> bucket_ratelimit::Result<bucket_ratelimit::Rate> {
        Err(BackendError::Unreachable("connection refused".into()).into())
    }
}

#[tokio::test]
async fn test_fail_open_forwards_without_headers() {
    let route = RouteRateLimit::with_defaults();
    let app = Router::new().route("/", get(handler)).layer(
        RateLimitLayer::new(FailingBackend, route).failure_policy(FailurePolicy::FailOpen),
    );

    let response = send(&app, get_request("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-RateLimit-Limit").is_none());
}

#[tokio::test]
async fn test_fail_closed_rejects() {
    let route = RouteRateLimit::with_defaults();
    let app = Router::new().route("/", get(handler)).layer(
        RateLimitLayer::new(FailingBackend, route).failure_policy(FailurePolicy::FailClosed),
    );

    let response = send(&app, get_request("/")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "Retry-After"), "120");
}
