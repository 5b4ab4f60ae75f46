//! Bucketed, fixed-window HTTP rate limiting for axum services.
//!
//! `bucket_ratelimit` throttles callers per logical route and speaks the
//! `X-RateLimit-*` header protocol popularized by chat-platform APIs:
//!
//! - **Fixed-window counting**: N uses per window, then a hard reset with no
//!   fractional refill
//! - **Opaque buckets**: caller, route and additional keys are mixed through
//!   SHA-256, so bucket ids leak nothing about caller identity
//! - **Pluggable backend**: the in-memory limiter ships here; a distributed
//!   store can implement [`RateLimiterBackend`] behind the same contract
//! - **Bounded memory**: a best-effort background purge drops expired buckets
//! - **Tower integration**: one [`middleware::RateLimitLayer`] per route
//!
//! # Quick Start
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use bucket_ratelimit::{InMemoryRateLimiter, RouteRateLimit, middleware::RateLimitLayer};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = InMemoryRateLimiter::new();
//!     let route = RouteRateLimit::builder()
//!         .limit(5)
//!         .window(Duration::from_secs(60))
//!         .build()
//!         .expect("valid route config");
//!
//!     let app: Router = Router::new()
//!         .route("/", get(|| async { "ok" }))
//!         .layer(RateLimitLayer::new(backend, route));
//! }
//! ```
//!
//! # Protocol
//!
//! Every response carries `X-RateLimit-Limit`, `X-RateLimit-Remaining`,
//! `X-RateLimit-Reset`, `X-RateLimit-Reset-After` and `X-RateLimit-Bucket`.
//! A rejected request additionally gets `Retry-After` (whole seconds), status
//! 429 and the JSON body
//! `{"message":"You are being rate limited.","retry_after":N,"global":false}`.
//! Clients may send `X-RateLimit-Precision: millisecond` to receive
//! fractional-second `Reset`/`Reset-After` values.

pub mod backend;
pub mod context;
pub mod error;
pub mod headers;
pub mod key;
pub mod middleware;
pub mod rate;
pub mod route;

// Re-export main types
pub use backend::{FailurePolicy, InMemoryRateLimiter, PurgeConfig, RateLimiterBackend};
pub use context::RateLimitContext;
pub use error::{BackendError, ConfigError, RateLimitError, Result};
pub use headers::Precision;
pub use key::{KeySource, derive_bucket_key};
pub use middleware::RateLimitLayer;
pub use rate::Rate;
pub use route::{RouteRateLimit, RouteRateLimitBuilder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backend::{FailurePolicy, InMemoryRateLimiter, PurgeConfig, RateLimiterBackend};
    pub use crate::context::RateLimitContext;
    pub use crate::error::{RateLimitError, Result};
    pub use crate::key::KeySource;
    pub use crate::middleware::RateLimitLayer;
    pub use crate::rate::Rate;
    pub use crate::route::RouteRateLimit;
}
