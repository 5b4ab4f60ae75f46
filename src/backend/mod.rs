//! Limiter backend trait and implementations.
//!
//! A backend owns the bucket map: given a bucket id and the evaluation
//! context it returns the current [`Rate`], creating or resetting the entry
//! as needed. The reference implementation is in-memory; a distributed store
//! can implement the same contract behind the trait.

mod memory;

pub use memory::{InMemoryRateLimiter, PurgeConfig};

use std::future::Future;

use crate::context::RateLimitContext;
use crate::error::Result;
use crate::rate::Rate;

/// Backend contract for bucketed rate limiting.
///
/// `handle` must be atomic per bucket: no two concurrent calls for the same
/// bucket id may interleave their read-modify-write, and calls for different
/// buckets must not serialize against each other. Semantics:
///
/// - absent or expired entry: store and return a fresh rate with the full
///   allowance and a reset instant one window from now;
/// - otherwise: decrement the stored remaining count (floored at zero),
///   store, return the updated snapshot.
///
/// A call may suspend (e.g. a network round trip) but must not hold any
/// process-wide lock while suspended.
pub trait RateLimiterBackend: Send + Sync + 'static {
    /// Evaluate one access to `bucket` under `ctx` and return the resulting
    /// rate snapshot.
    fn handle(
        &self,
        ctx: &RateLimitContext,
        bucket: &str,
    ) -> impl Future<Output = Result<Rate>> + Send;
}

impl<B: RateLimiterBackend> RateLimiterBackend for std::sync::Arc<B> {
    async fn handle(&self, ctx: &RateLimitContext, bucket: &str) -> Result<Rate> {
        (**self).handle(ctx, bucket).await
    }
}

/// What the middleware does when a backend call fails.
///
/// The in-memory backend cannot fail this way; for a distributed backend the
/// operator must choose explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Forward the request without rate limiting.
    #[default]
    FailOpen,
    /// Reject the request as if the bucket were exhausted.
    FailClosed,
}

/// Current wall-clock time as Unix epoch milliseconds.
pub(crate) fn unix_now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
