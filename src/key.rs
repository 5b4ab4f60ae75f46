//! Bucket key derivation and key extraction.
//!
//! A bucket is identified by three inputs: the caller key ("who"), the route
//! key ("which endpoint") and an optional additional key ("which
//! sub-resource"). The three are mixed through a SHA-256 digest so the bucket
//! id exposed to clients cannot be reversed into a caller identity, and so
//! concatenation boundaries cannot be abused to force collisions.
//!
//! # Example
//!
//! ```ignore
//! use bucket_ratelimit::key::{derive_bucket_key, KeySource};
//!
//! let bucket = derive_bucket_key(b"203.0.113.50", route_key, b"guild:42");
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::Request;
use sha2::{Digest, Sha256};

/// Length of a generated per-route key in bytes.
pub const ROUTE_KEY_LEN: usize = 64;

/// Derive an opaque bucket id from the three key inputs.
///
/// The inputs are digested in the fixed order caller, additional, route and
/// the SHA-256 output is base64-encoded. Each input is prefixed with its
/// length so shifting bytes across a segment boundary changes the digest.
/// Two requests share a bucket iff all three inputs are identical. Pure
/// computation, no I/O.
pub fn derive_bucket_key(caller: &[u8], route: &[u8], additional: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for part in [caller, additional, route] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    STANDARD.encode(hasher.finalize())
}

/// Generate a random route key at mount time.
///
/// Route keys are fixed for the process lifetime of a mounted route and never
/// reused across routes, which gives route isolation without explicit
/// namespacing.
pub fn generate_route_key() -> [u8; ROUTE_KEY_LEN] {
    use rand::Rng;

    let mut key = [0u8; ROUTE_KEY_LEN];
    rand::rng().fill(&mut key[..]);
    key
}

/// Strategy for extracting a key from an incoming request.
///
/// A closed set of variants rather than opaque closures, so route
/// configuration stays inspectable; `Custom` remains the escape hatch.
#[derive(Clone)]
pub enum KeySource {
    /// The remote peer address: `ConnectInfo` when available, otherwise the
    /// first `x-forwarded-for` entry, then `x-real-ip`.
    RemoteAddress,

    /// The raw bytes of the named request header.
    Header(String),

    /// A fixed byte sequence. `Static(vec![])` is the default additional key.
    Static(Vec<u8>),

    /// An arbitrary extraction function.
    Custom(Arc<dyn Fn(&Request<Body>) -> Vec<u8> + Send + Sync>),
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoteAddress => f.write_str("RemoteAddress"),
            Self::Header(name) => f.debug_tuple("Header").field(name).finish(),
            Self::Static(bytes) => f.debug_tuple("Static").field(&bytes.len()).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl KeySource {
    /// The empty constant key.
    pub fn none() -> Self {
        Self::Static(Vec::new())
    }

    /// Build a custom extractor from a function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Request<Body>) -> Vec<u8> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Extract the key bytes from a request.
    ///
    /// Missing data (no peer address, absent header) yields empty bytes, so
    /// such requests collapse into one shared bucket instead of failing.
    pub fn extract(&self, request: &Request<Body>) -> Vec<u8> {
        match self {
            Self::RemoteAddress => remote_host_bytes(request),
            Self::Header(name) => request
                .headers()
                .get(name.as_str())
                .map(|v| v.as_bytes().to_vec())
                .unwrap_or_default(),
            Self::Static(bytes) => bytes.clone(),
            Self::Custom(f) => f(request),
        }
    }
}

/// The caller's remote host as bytes.
fn remote_host_bytes(request: &Request<Body>) -> Vec<u8> {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string().into_bytes();
    }
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.as_bytes().to_vec();
        }
    }
    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.trim().as_bytes().to_vec();
    }
    Vec::new()
}
