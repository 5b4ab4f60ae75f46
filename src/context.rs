//! Per-evaluation rate limit parameters.
//!
//! A [`RateLimitContext`] tells a backend how many uses one window allows and
//! how long the window lasts. It is constructed per request from the global
//! defaults, overridable per mounted route, and is never persisted.
//!
//! # Examples
//!
//! ```ignore
//! use bucket_ratelimit::RateLimitContext;
//! use std::time::Duration;
//!
//! // 50 uses per 2 minutes (the defaults)
//! let ctx = RateLimitContext::default();
//!
//! // 5 uses per minute
//! let ctx = RateLimitContext::per_minute(5);
//!
//! // Custom window
//! let ctx = RateLimitContext::new(3, Duration::from_millis(300));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default maximum uses per window.
pub const DEFAULT_LIMIT: u64 = 50;

/// Default window duration.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(120);

/// Limit and window duration for one rate limit evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitContext {
    /// Maximum uses per window.
    limit: u64,

    /// Fixed window duration.
    window: Duration,
}

impl RateLimitContext {
    /// Create a new context with the given limit and window.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0 or `window` is zero duration.
    pub fn new(limit: u64, window: Duration) -> Self {
        assert!(limit > 0, "limit must be greater than 0");
        assert!(!window.is_zero(), "window must be non-zero");

        Self { limit, window }
    }

    /// Try to create a new context, returning an error if invalid.
    pub fn try_new(limit: u64, window: Duration) -> Result<Self> {
        if limit == 0 {
            return Err(ConfigError::InvalidLimit("limit must be greater than 0".into()).into());
        }
        if window.is_zero() {
            return Err(ConfigError::InvalidWindow("window must be non-zero".into()).into());
        }
        Ok(Self { limit, window })
    }

    /// Create a context allowing `n` uses per second.
    pub fn per_second(n: u64) -> Self {
        Self::new(n, Duration::from_secs(1))
    }

    /// Create a context allowing `n` uses per minute.
    pub fn per_minute(n: u64) -> Self {
        Self::new(n, Duration::from_secs(60))
    }

    /// Get the maximum uses per window.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Get the window duration.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RateLimitContext {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_WINDOW)
    }
}
