//! Error types for the cache subsystem.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Everything a cache operation can fail with.
///
/// A missing or expired key is never an error: `get` returns `Ok(None)` and
/// `remove` on a missing key succeeds.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No provider candidate is registered, enabled, or matches the configured name.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// A caller passed an argument that can never be valid (empty key or cache id).
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },

    /// A provider was asked for a client before `initialize` ran.
    #[error("cache provider '{0}' has not been initialized")]
    NotInitialized(&'static str),

    /// The backing store itself failed.
    #[error("backing store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CacheError {
    pub(crate) fn empty(name: &'static str) -> Self {
        Self::InvalidArgument {
            name,
            reason: "must not be empty",
        }
    }
}

/// Reject empty keys before any state is touched.
pub(crate) fn ensure_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::empty("key"));
    }
    Ok(())
}
