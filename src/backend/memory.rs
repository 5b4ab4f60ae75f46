//! In-memory limiter backend with a best-effort purge sweep.
//!
//! Buckets live in a `DashMap`, so concurrent accesses to different buckets
//! never serialize against each other while accesses to the same bucket go
//! through one atomic read-modify-write. A background sweep drops expired
//! entries once the map grows past a threshold; it only bounds memory, and
//! correctness never depends on it because expired entries are treated as
//! absent on access.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::backend::{RateLimiterBackend, unix_now_ms};
use crate::context::RateLimitContext;
use crate::error::Result;
use crate::rate::Rate;

/// Purge sweep configuration.
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// Sweep only when the map holds more entries than this.
    pub max_entries: usize,
    /// Minimum time between completed sweeps.
    pub cooldown: Duration,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            cooldown: Duration::from_secs(3600),
        }
    }
}

impl PurgeConfig {
    /// Create a config with the given size threshold and cooldown.
    pub fn new(max_entries: usize, cooldown: Duration) -> Self {
        Self {
            max_entries,
            cooldown,
        }
    }

    /// Never trigger the sweep automatically.
    pub fn disabled() -> Self {
        Self {
            max_entries: usize::MAX,
            cooldown: Duration::ZERO,
        }
    }
}

struct Inner {
    buckets: DashMap<String, Rate>,
    purge: PurgeConfig,
    /// Completion time of the last sweep, Unix epoch milliseconds. Starts at
    /// zero so the first qualifying access may sweep immediately.
    last_purge_ms: AtomicU64,
    /// Held for the duration of one sweep; `try_lock` makes a concurrent
    /// trigger a silent no-op and the scoped guard releases on panic.
    purge_gate: Mutex<()>,
}

/// The default, process-local limiter backend.
///
/// Cloning is cheap and clones share the same bucket map.
///
/// # Example
///
/// ```ignore
/// use bucket_ratelimit::{InMemoryRateLimiter, PurgeConfig};
/// use std::time::Duration;
///
/// let limiter = InMemoryRateLimiter::new();
/// let limiter = InMemoryRateLimiter::with_purge(PurgeConfig::new(1000, Duration::from_secs(600)));
/// ```
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for InMemoryRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRateLimiter")
            .field("entries", &self.inner.buckets.len())
            .field("purge", &self.inner.purge)
            .finish()
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRateLimiter {
    /// Create a limiter with the default purge configuration.
    pub fn new() -> Self {
        Self::with_purge(PurgeConfig::default())
    }

    /// Create a limiter with a custom purge configuration.
    pub fn with_purge(purge: PurgeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                buckets: DashMap::new(),
                purge,
                last_purge_ms: AtomicU64::new(0),
                purge_gate: Mutex::new(()),
            }),
        }
    }

    /// Number of buckets currently stored.
    pub fn len(&self) -> usize {
        self.inner.buckets.len()
    }

    /// Check if no buckets are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.buckets.is_empty()
    }

    /// Drop all buckets.
    pub fn clear(&self) {
        self.inner.buckets.clear();
    }

    /// Run a sweep immediately, regardless of threshold and cooldown.
    pub fn purge_now(&self) {
        let _gate = self.inner.purge_gate.lock();
        sweep(&self.inner);
    }

    /// Spawn a detached sweep when both trigger conditions hold.
    ///
    /// Never blocks the caller; a trigger while a sweep is in flight is
    /// dropped, not queued, and the next qualifying access tries again.
    fn maybe_purge(&self, now_ms: u64) {
        let purge = &self.inner.purge;
        if self.inner.buckets.len() <= purge.max_entries {
            return;
        }
        let last = self.inner.last_purge_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < purge.cooldown.as_millis() as u64 {
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let Some(_gate) = inner.purge_gate.try_lock() else {
                return;
            };
            sweep(&inner);
        });
    }
}

/// Remove every entry whose reset instant has passed, then record the
/// completion time.
fn sweep(inner: &Inner) {
    let now = unix_now_ms();
    inner.buckets.retain(|_, rate| !rate.is_expired_at(now));
    inner.last_purge_ms.store(unix_now_ms(), Ordering::Relaxed);
    tracing::debug!(entries = inner.buckets.len(), "purge sweep completed");
}

impl RateLimiterBackend for InMemoryRateLimiter {
    async fn handle(&self, ctx: &RateLimitContext, bucket: &str) -> Result<Rate> {
        let now = unix_now_ms();
        let reset_at = now + ctx.window().as_millis() as u64;
        let limit = ctx.limit();

        // The entry API serializes accesses per bucket; the shard lock is
        // released at the end of this statement.
        let snapshot = *self
            .inner
            .buckets
            .entry(bucket.to_string())
            .and_modify(|rate| {
                *rate = if rate.is_expired_at(now) {
                    Rate::fresh(limit, reset_at)
                } else {
                    rate.consume()
                };
            })
            .or_insert_with(|| Rate::fresh(limit, reset_at));

        self.maybe_purge(now);

        Ok(snapshot)
    }
}
