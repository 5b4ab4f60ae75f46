//! Tower layer implementing the rate limit protocol.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use http::{Request, Response, StatusCode, header};
use serde::Serialize;
use tower::{Layer, Service};

use crate::backend::{FailurePolicy, RateLimiterBackend, unix_now_ms};
use crate::headers::{Precision, names, rate_limit_headers, retry_after_seconds};
use crate::key::derive_bucket_key;
use crate::rate::Rate;
use crate::route::RouteRateLimit;

/// Tower layer for per-route rate limiting.
///
/// One layer corresponds to one mounted route: it owns that route's random
/// key and overrides, and shares the backend with every other route.
pub struct RateLimitLayer<B> {
    backend: Arc<B>,
    route: Arc<RouteRateLimit>,
    failure_policy: FailurePolicy,
}

impl<B> RateLimitLayer<B> {
    /// Create a new rate limit layer for one route.
    pub fn new(backend: B, route: RouteRateLimit) -> Self {
        Self {
            backend: Arc::new(backend),
            route: Arc::new(route),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Create a layer sharing an already wrapped backend.
    pub fn with_shared_backend(backend: Arc<B>, route: RouteRateLimit) -> Self {
        Self {
            backend,
            route: Arc::new(route),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Choose what happens when the backend fails.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

impl<B> Clone for RateLimitLayer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            route: self.route.clone(),
            failure_policy: self.failure_policy,
        }
    }
}

impl<B, Inner> Layer<Inner> for RateLimitLayer<B> {
    type Service = RateLimitService<B, Inner>;

    fn layer(&self, inner: Inner) -> Self::Service {
        RateLimitService {
            inner,
            backend: self.backend.clone(),
            route: self.route.clone(),
            failure_policy: self.failure_policy,
        }
    }
}

/// The rate limiting service produced by [`RateLimitLayer`].
pub struct RateLimitService<B, Inner> {
    inner: Inner,
    backend: Arc<B>,
    route: Arc<RouteRateLimit>,
    failure_policy: FailurePolicy,
}

impl<B, Inner: Clone> Clone for RateLimitService<B, Inner> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            backend: self.backend.clone(),
            route: self.route.clone(),
            failure_policy: self.failure_policy,
        }
    }
}

impl<B, Inner> Service<Request<Body>> for RateLimitService<B, Inner>
where
    B: RateLimiterBackend,
    Inner: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    Inner::Future: Send,
{
    type Response = Response<Body>;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let backend = self.backend.clone();
        let route = self.route.clone();
        let failure_policy = self.failure_policy;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let caller = route.caller_key().extract(&request);
            let additional = route.additional_key().extract(&request);
            let bucket = derive_bucket_key(&caller, route.route_key(), &additional);
            let precision = Precision::from_request(&request);
            let ctx = route.context();

            let rate = match backend.handle(&ctx, &bucket).await {
                Ok(rate) => rate,
                Err(err) => {
                    return match failure_policy {
                        FailurePolicy::FailOpen => {
                            tracing::warn!(error = %err, "limiter backend failed, failing open");
                            inner.call(request).await
                        }
                        FailurePolicy::FailClosed => {
                            tracing::warn!(error = %err, "limiter backend failed, failing closed");
                            let retry_after = retry_after_seconds(ctx.window());
                            Ok(rejection_response(retry_after))
                        }
                    };
                }
            };

            let now = unix_now_ms();
            let header_pairs = rate_limit_headers(ctx.limit(), &rate, &bucket, now, precision);

            if is_limited(&rate, now) {
                tracing::debug!(bucket = %bucket, "request rate limited");
                let retry_after = retry_after_seconds(rate.reset_after(now));
                let mut response = rejection_response(retry_after);
                apply_headers(&mut response, &header_pairs);
                Ok(response)
            } else {
                let mut response = inner.call(request).await?;
                apply_headers(&mut response, &header_pairs);
                Ok(response)
            }
        })
    }
}

/// Reject iff the window is still open and the post-access remaining count is
/// zero. A request that returns a positive count is allowed even when the
/// presented `Remaining` header reads 0, so the limit admits exactly N
/// requests per window and rejects the (N+1)th.
fn is_limited(rate: &Rate, now_ms: u64) -> bool {
    rate.remaining() == 0 && !rate.is_expired_at(now_ms)
}

#[derive(Debug, Serialize)]
struct RateLimitedBody {
    message: &'static str,
    retry_after: u64,
    global: bool,
}

/// Build the 429 response. `retry_after` is whole seconds, rounded up, and
/// appears identically in the `Retry-After` header and the JSON body.
fn rejection_response(retry_after: u64) -> Response<Body> {
    let body = RateLimitedBody {
        message: "You are being rate limited.",
        retry_after,
        global: false,
    };
    let json = serde_json::to_string(&body).expect("body serialization is infallible");

    let mut response = Response::new(Body::from(json));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
    headers.insert(names::RETRY_AFTER, retry_after.to_string().parse().unwrap());

    response
}

fn apply_headers(response: &mut Response<Body>, pairs: &[(&'static str, String)]) {
    let headers = response.headers_mut();
    for (name, value) in pairs {
        if let Ok(header_value) = value.parse() {
            headers.insert(*name, header_value);
        }
    }
}
