//! The per-bucket rate snapshot.
//!
//! A [`Rate`] is an immutable view of one bucket: how many uses remain and
//! when the window resets. Backends may mutate their internal storage, but
//! every value handed to a caller is a copy; holders must treat a snapshot
//! whose reset instant has passed as logically expired regardless of the
//! remaining count.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Remaining uses and reset instant for one bucket.
///
/// `reset_at_ms` is an absolute Unix-epoch timestamp in milliseconds; wall
/// clock `now()` is the only time authority in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    remaining: u64,
    reset_at_ms: u64,
}

impl Rate {
    /// Create a fresh rate for a new window with the full allowance.
    pub fn fresh(limit: u64, reset_at_ms: u64) -> Self {
        Self {
            remaining: limit,
            reset_at_ms,
        }
    }

    /// Remaining uses in the current window. Never negative.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Absolute reset instant, Unix epoch milliseconds.
    pub fn reset_at_ms(&self) -> u64 {
        self.reset_at_ms
    }

    /// Whether the window has ended as of `now_ms`.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.reset_at_ms <= now_ms
    }

    /// Time until the window resets, saturating at zero.
    pub fn reset_after(&self, now_ms: u64) -> Duration {
        Duration::from_millis(self.reset_at_ms.saturating_sub(now_ms))
    }

    /// Return a copy with one use consumed, floored at zero.
    pub fn consume(&self) -> Self {
        Self {
            remaining: self.remaining.saturating_sub(1),
            reset_at_ms: self.reset_at_ms,
        }
    }
}
