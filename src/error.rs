//! Error types for rate limiting operations.
//!
//! Misconfiguration is always surfaced at route-mount time through
//! [`ConfigError`]; it is never silently coerced. Backend errors can only
//! originate from pluggable backends (the in-memory limiter is infallible)
//! and are resolved by the middleware's failure policy.

use std::time::Duration;
use thiserror::Error;

/// Result type for rate limiting operations.
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Main error type for rate limiting operations.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Configuration error, fatal at route-mount time.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Limiter backend error.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The per-window use limit must be positive.
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// The window duration must be non-zero.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),
}

/// Errors from a limiter backend.
///
/// Only relevant for distributed backends; how the middleware reacts is
/// decided by [`FailurePolicy`](crate::backend::FailurePolicy).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// The backend did not answer within the caller-imposed deadline.
    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    /// Any other backend failure.
    #[error("{0}")]
    Internal(String),
}
