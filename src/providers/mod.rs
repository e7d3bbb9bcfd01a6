//! Built-in cache providers.
//!
//! Add a provider by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_provider;` below
//! 3. Registering a `CacheProviderEntry` in `CACHE_PROVIDERS`

pub mod cascade;
pub mod partitioned;

pub use cascade::{CascadeCacheClient, CascadeCacheProvider};
pub use partitioned::{PartitionedCacheClient, PartitionedCacheProvider};
