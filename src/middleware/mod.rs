//! Axum middleware for rate limiting.
//!
//! Provides a Tower-compatible layer that derives a bucket for each request,
//! consults the limiter backend and either forwards the request or terminates
//! it with a 429 response. Rate limit headers are attached either way.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use bucket_ratelimit::{
//!     middleware::RateLimitLayer,
//!     InMemoryRateLimiter, RouteRateLimit,
//! };
//! use std::time::Duration;
//!
//! let backend = InMemoryRateLimiter::new();
//! let route = RouteRateLimit::builder()
//!     .limit(5)
//!     .window(Duration::from_secs(60))
//!     .build()?;
//!
//! let app = Router::new()
//!     .route("/api/data", get(handler))
//!     .layer(RateLimitLayer::new(backend, route));
//! ```

mod layer;

pub use layer::{RateLimitLayer, RateLimitService};
