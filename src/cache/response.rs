//! Response caching on top of a cache client.
//!
//! Requests that know their own cache key can have their responses memoized:
//!
//! ```ignore
//! let responses = ResponseCache::new(create_client("settings")?, "documents");
//! let directive = CachingDirective::enabled(Duration::from_secs(60));
//!
//! let doc = responses.fetch(&request, &directive, || service.get_document(&request))?;
//! ```

use std::time::Duration;

use tracing::debug;

use crate::error::CacheError;

use super::{CacheClient, CacheValue, Cacheable, GetOptions, PutOptions, RemoveOptions};

/// Implemented by request types that can be used as cache keys.
pub trait DefinesCacheKey {
    fn cache_key(&self) -> String;
}

/// Whether and how a response may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachingDirective {
    pub enabled: bool,
    pub expiration: Duration,
    pub sliding: bool,
}

impl CachingDirective {
    /// Cache responses for `expiration` (absolute).
    pub fn enabled(expiration: Duration) -> Self {
        Self {
            enabled: true,
            expiration,
            sliding: false,
        }
    }

    /// Never cache.
    pub fn none() -> Self {
        Self {
            enabled: false,
            expiration: Duration::ZERO,
            sliding: false,
        }
    }

    /// Renew the expiration on every hit (builder pattern).
    #[must_use]
    pub fn sliding(mut self) -> Self {
        self.sliding = true;
        self
    }
}

/// Memoizes responses in one region of a logical cache.
pub struct ResponseCache {
    client: Box<dyn CacheClient>,
    region: Option<String>,
}

impl ResponseCache {
    pub fn new(client: Box<dyn CacheClient>, region: impl Into<String>) -> Self {
        Self {
            client,
            region: Some(region.into()).filter(|r| !r.is_empty()),
        }
    }

    pub fn client(&self) -> &dyn CacheClient {
        self.client.as_ref()
    }

    /// Return the cached response for `request`, or compute and cache it.
    ///
    /// A cached value of another type counts as a miss. Nothing is cached
    /// when `compute` fails or the directive disables caching.
    pub fn fetch<R, T, E, F>(
        &self,
        request: &R,
        directive: &CachingDirective,
        compute: F,
    ) -> Result<T, E>
    where
        R: DefinesCacheKey + ?Sized,
        T: Cacheable + Clone,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        if !directive.enabled {
            return compute();
        }

        let key = request.cache_key();
        let get = GetOptions {
            region: self.region.clone(),
        };
        if let Some(cached) = self.client.get(&key, &get)?
            && let Some(response) = cached.downcast_ref::<T>()
        {
            debug!("Response for '{}' served from cache", key);
            return Ok(response.clone());
        }

        let response = compute()?;
        let put = PutOptions {
            region: self.region.clone(),
            expiration: directive.expiration,
            sliding: directive.sliding,
        };
        self.client.put(&key, CacheValue::new(response.clone()), &put)?;
        Ok(response)
    }

    /// Drop the cached response for `request`, if any.
    pub fn invalidate<R>(&self, request: &R) -> Result<(), CacheError>
    where
        R: DefinesCacheKey + ?Sized,
    {
        let remove = RemoveOptions {
            region: self.region.clone(),
        };
        self.client.remove(&request.cache_key(), &remove)
    }

    /// Drop every cached response in this cache's region.
    pub fn invalidate_all(&self) -> Result<(), CacheError> {
        self.client.clear_region(self.region.as_deref())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("cache_id", &self.client.cache_id())
            .field("region", &self.region)
            .finish()
    }
}
