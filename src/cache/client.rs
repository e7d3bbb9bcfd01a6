//! Client contract for a single logical cache.

use crate::error::Result;

use super::{CacheValue, GetOptions, PutOptions, RemoveOptions};

/// A handle bound to exactly one logical cache.
///
/// Clients never own storage: dropping one releases only the handle, never
/// the shared backing store. All methods may be called concurrently from any
/// thread.
///
/// Region arguments take `None` or `Some("")` for the default region.
pub trait CacheClient: Send + Sync {
    /// Id of the logical cache this client is bound to.
    fn cache_id(&self) -> &str;

    /// Get the current value, or `None` if absent or expired.
    ///
    /// A hit on a sliding item renews its deadline.
    fn get(&self, key: &str, options: &GetOptions) -> Result<Option<CacheValue>>;

    /// Store or replace the item under `(cache_id, options.region, key)`.
    fn put(&self, key: &str, value: CacheValue, options: &PutOptions) -> Result<()>;

    /// Delete the item if present. Removing a missing key is not an error.
    fn remove(&self, key: &str, options: &RemoveOptions) -> Result<()>;

    /// Whether the region has been created and not since cleared.
    ///
    /// The default region always exists.
    fn region_exists(&self, region: Option<&str>) -> Result<bool>;

    /// Discard every item in the region, leaving it empty and usable.
    ///
    /// The default region clears only itself, never the whole cache.
    fn clear_region(&self, region: Option<&str>) -> Result<()>;

    /// Discard every region and item of this logical cache.
    fn clear_cache(&self) -> Result<()>;
}

impl std::fmt::Debug for dyn CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("cache_id", &self.cache_id())
            .finish()
    }
}
