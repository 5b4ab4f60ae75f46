//! Per-route rate limit configuration.
//!
//! One [`RouteRateLimit`] is built for each mounted route. Building it draws
//! the route key (64 random bytes, fixed for the process lifetime of the
//! route) and validates the limit and window, so a misconfigured route fails
//! at startup instead of limping along.
//!
//! # Example
//!
//! ```ignore
//! use bucket_ratelimit::{KeySource, RouteRateLimit};
//! use std::time::Duration;
//!
//! let route = RouteRateLimit::builder()
//!     .limit(5)
//!     .window(Duration::from_secs(60))
//!     .additional_key(KeySource::Header("x-guild-id".into()))
//!     .build()?;
//! ```

use std::time::Duration;

use crate::context::RateLimitContext;
use crate::error::Result;
use crate::key::{KeySource, ROUTE_KEY_LEN, generate_route_key};

/// Configuration for one mounted route.
#[derive(Debug, Clone)]
pub struct RouteRateLimit {
    context: RateLimitContext,
    route_key: [u8; ROUTE_KEY_LEN],
    caller_key: KeySource,
    additional_key: KeySource,
}

impl RouteRateLimit {
    /// Start building a route configuration.
    pub fn builder() -> RouteRateLimitBuilder {
        RouteRateLimitBuilder::new()
    }

    /// Build a route with the global defaults.
    pub fn with_defaults() -> Self {
        Self::builder().build().expect("defaults are valid")
    }

    /// The evaluation context applied to requests on this route.
    pub fn context(&self) -> RateLimitContext {
        self.context
    }

    /// The route's random key.
    pub fn route_key(&self) -> &[u8] {
        &self.route_key
    }

    /// How the caller key is extracted.
    pub fn caller_key(&self) -> &KeySource {
        &self.caller_key
    }

    /// How the additional key is extracted.
    pub fn additional_key(&self) -> &KeySource {
        &self.additional_key
    }
}

/// Builder for [`RouteRateLimit`].
#[derive(Debug, Default)]
pub struct RouteRateLimitBuilder {
    limit: Option<u64>,
    window: Option<Duration>,
    caller_key: Option<KeySource>,
    additional_key: Option<KeySource>,
}

impl RouteRateLimitBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the maximum uses per window.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Override the window duration.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Override the caller-key extraction (default: remote address).
    pub fn caller_key(mut self, source: KeySource) -> Self {
        self.caller_key = Some(source);
        self
    }

    /// Set the per-request additional key (default: constant empty).
    pub fn additional_key(mut self, source: KeySource) -> Self {
        self.additional_key = Some(source);
        self
    }

    /// Validate and build, generating the route key.
    pub fn build(self) -> Result<RouteRateLimit> {
        let defaults = RateLimitContext::default();
        let context = RateLimitContext::try_new(
            self.limit.unwrap_or(defaults.limit()),
            self.window.unwrap_or(defaults.window()),
        )?;

        Ok(RouteRateLimit {
            context,
            route_key: generate_route_key(),
            caller_key: self.caller_key.unwrap_or(KeySource::RemoteAddress),
            additional_key: self.additional_key.unwrap_or_else(KeySource::none),
        })
    }
}
