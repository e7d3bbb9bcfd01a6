//! Logging client decorator.

use tracing::Level;

use crate::config::ClientLogLevel;
use crate::error::Result;

use super::{CacheClient, CacheValue, GetOptions, PutOptions, RemoveOptions, region_name};

/// Target every decorator event is emitted under.
pub const LOG_TARGET: &str = "regioncache::client";

// tracing needs a constant level per callsite, so dispatch by hand.
macro_rules! emit {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            ClientLogLevel::Off => {}
            ClientLogLevel::Error => tracing::error!(target: LOG_TARGET, $($arg)+),
            ClientLogLevel::Warn => tracing::warn!(target: LOG_TARGET, $($arg)+),
            ClientLogLevel::Info => tracing::info!(target: LOG_TARGET, $($arg)+),
            ClientLogLevel::Debug => tracing::debug!(target: LOG_TARGET, $($arg)+),
            ClientLogLevel::Trace => tracing::trace!(target: LOG_TARGET, $($arg)+),
        }
    };
}

/// Pass-through client that logs the outcome of every call.
///
/// Results and errors of the inner client are returned untouched.
pub struct LoggingCacheClient {
    inner: Box<dyn CacheClient>,
    level: ClientLogLevel,
}

impl LoggingCacheClient {
    pub fn new(inner: Box<dyn CacheClient>, level: ClientLogLevel) -> Self {
        Self { inner, level }
    }

    /// Whether events at `level` would currently be recorded.
    pub fn enabled(level: ClientLogLevel) -> bool {
        match level {
            ClientLogLevel::Off => false,
            ClientLogLevel::Error => tracing::enabled!(target: LOG_TARGET, Level::ERROR),
            ClientLogLevel::Warn => tracing::enabled!(target: LOG_TARGET, Level::WARN),
            ClientLogLevel::Info => tracing::enabled!(target: LOG_TARGET, Level::INFO),
            ClientLogLevel::Debug => tracing::enabled!(target: LOG_TARGET, Level::DEBUG),
            ClientLogLevel::Trace => tracing::enabled!(target: LOG_TARGET, Level::TRACE),
        }
    }

    pub fn into_inner(self) -> Box<dyn CacheClient> {
        self.inner
    }
}

impl CacheClient for LoggingCacheClient {
    fn cache_id(&self) -> &str {
        self.inner.cache_id()
    }

    fn get(&self, key: &str, options: &GetOptions) -> Result<Option<CacheValue>> {
        let result = self.inner.get(key, options);
        match &result {
            Ok(Some(value)) => emit!(
                self.level,
                cache_id = %self.cache_id(),
                region = %options.region(),
                key = %key,
                value = ?value,
                "hit"
            ),
            Ok(None) => emit!(
                self.level,
                cache_id = %self.cache_id(),
                region = %options.region(),
                key = %key,
                "miss"
            ),
            Err(_) => {}
        }
        result
    }

    fn put(&self, key: &str, value: CacheValue, options: &PutOptions) -> Result<()> {
        let result = self.inner.put(key, value, options);
        if result.is_ok() {
            emit!(
                self.level,
                cache_id = %self.cache_id(),
                region = %options.region(),
                key = %key,
                expiration_ms = options.expiration.as_millis() as u64,
                sliding = options.sliding,
                "put"
            );
        }
        result
    }

    fn remove(&self, key: &str, options: &RemoveOptions) -> Result<()> {
        let result = self.inner.remove(key, options);
        if result.is_ok() {
            emit!(
                self.level,
                cache_id = %self.cache_id(),
                region = %options.region(),
                key = %key,
                "remove"
            );
        }
        result
    }

    fn region_exists(&self, region: Option<&str>) -> Result<bool> {
        self.inner.region_exists(region)
    }

    fn clear_region(&self, region: Option<&str>) -> Result<()> {
        let result = self.inner.clear_region(region);
        if result.is_ok() {
            emit!(
                self.level,
                cache_id = %self.cache_id(),
                region = %region_name(region),
                "cleared region"
            );
        }
        result
    }

    fn clear_cache(&self) -> Result<()> {
        let result = self.inner.clear_cache();
        if result.is_ok() {
            emit!(self.level, cache_id = %self.cache_id(), "cleared cache");
        }
        result
    }
}

impl std::fmt::Debug for LoggingCacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingCacheClient")
            .field("cache_id", &self.cache_id())
            .field("level", &self.level)
            .finish()
    }
}
