//! HTTP headers of the rate limit protocol.
//!
//! The middleware attaches the `X-RateLimit-*` family to every response, and
//! `Retry-After` only on rejection. A request can opt into sub-second
//! rendering with `X-RateLimit-Precision: millisecond`; `Retry-After` is
//! always whole seconds regardless.

use std::time::Duration;

use axum::body::Body;
use http::Request;

use crate::rate::Rate;

/// Header names used by the protocol.
pub mod names {
    /// Maximum uses allowed per window.
    pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";

    /// Remaining uses after the current request.
    pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";

    /// Absolute reset instant, epoch seconds.
    pub const RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";

    /// Seconds until the reset instant.
    pub const RATE_LIMIT_RESET_AFTER: &str = "X-RateLimit-Reset-After";

    /// Opaque bucket identifier.
    pub const RATE_LIMIT_BUCKET: &str = "X-RateLimit-Bucket";

    /// Standard HTTP retry hint, whole seconds, rejection only.
    pub const RETRY_AFTER: &str = "Retry-After";

    /// Request header selecting the rendering precision.
    pub const RATE_LIMIT_PRECISION: &str = "X-RateLimit-Precision";
}

/// Rendering precision for `Reset` and `Reset-After`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Ceiling-rounded integer seconds.
    #[default]
    Second,
    /// Fractional seconds with millisecond resolution.
    Millisecond,
}

impl Precision {
    /// Read the precision hint from a request.
    ///
    /// Only the exact value `millisecond` selects fractional rendering; any
    /// other value, including an absent header, means integer seconds.
    pub fn from_request(request: &Request<Body>) -> Self {
        match request
            .headers()
            .get(names::RATE_LIMIT_PRECISION)
            .and_then(|v| v.to_str().ok())
        {
            Some("millisecond") => Self::Millisecond,
            _ => Self::Second,
        }
    }

    /// Render an absolute epoch-millisecond instant as epoch seconds.
    pub fn render_instant(&self, epoch_ms: u64) -> String {
        match self {
            Self::Second => ceil_seconds(epoch_ms).to_string(),
            Self::Millisecond => format!("{:.3}", epoch_ms as f64 / 1000.0),
        }
    }

    /// Render a duration as seconds.
    pub fn render_duration(&self, duration: Duration) -> String {
        match self {
            Self::Second => ceil_seconds(duration.as_millis() as u64).to_string(),
            Self::Millisecond => format!("{:.3}", duration.as_secs_f64()),
        }
    }
}

/// Whole seconds rounded up, for `Retry-After` and the rejection body.
pub fn retry_after_seconds(duration: Duration) -> u64 {
    ceil_seconds(duration.as_millis() as u64)
}

fn ceil_seconds(ms: u64) -> u64 {
    ms.div_ceil(1000)
}

/// The full header set for one evaluated request.
///
/// `remaining` is presented as one less than the stored post-access value, so
/// clients see the budget left after this very request; an allowed request
/// that used the last slot reports `Remaining: 0`.
pub fn rate_limit_headers(
    limit: u64,
    rate: &Rate,
    bucket: &str,
    now_ms: u64,
    precision: Precision,
) -> Vec<(&'static str, String)> {
    vec![
        (names::RATE_LIMIT_LIMIT, limit.to_string()),
        (
            names::RATE_LIMIT_REMAINING,
            rate.remaining().saturating_sub(1).to_string(),
        ),
        (
            names::RATE_LIMIT_RESET,
            precision.render_instant(rate.reset_at_ms()),
        ),
        (
            names::RATE_LIMIT_RESET_AFTER,
            precision.render_duration(rate.reset_after(now_ms)),
        ),
        (names::RATE_LIMIT_BUCKET, bucket.to_string()),
    ]
}
