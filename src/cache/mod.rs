//! Cache module - multi-tenant caching with regions and pluggable providers.
//!
//! ## Architecture
//!
//! - `CacheRegistry` - Resolves the provider and hands out clients
//! - `CacheProvider` - Pluggable backend, constructed once per process
//! - `CacheClient` - Handle bound to one logical cache id
//! - `LoggingCacheClient` - Decorator logging every outcome
//!
//! A logical cache is split into regions; a region is the unit of bulk
//! invalidation. The default region is named by `None` or `""`.
//!
//! ## Usage
//!
//! ```ignore
//! let client = regioncache::create_client("worklists")?;
//!
//! let options = PutOptions::sliding(Duration::from_secs(60)).with_region("ward-3");
//! client.put("patient:17", CacheValue::new(items), &options)?;
//!
//! let hit = client.get("patient:17", &GetOptions::new().with_region("ward-3"))?;
//! client.clear_region(Some("ward-3"))?;
//! ```

mod client;
mod logging;
mod options;
mod provider;
mod registry;
mod response;
mod store;
mod value;

pub use client::CacheClient;
pub use logging::{LOG_TARGET, LoggingCacheClient};
pub use options::{DEFAULT_EXPIRATION, Expiration, GetOptions, PutOptions, RemoveOptions};
pub use provider::{
    CACHE_PROVIDERS, CacheProvider, CacheProviderEntry, ProviderInitArgs, list_providers,
};
pub use registry::{CacheRegistry, create_client, global, is_supported};
pub use response::{CachingDirective, DefinesCacheKey, ResponseCache};
pub use value::{CacheValue, Cacheable};

pub(crate) use options::region_name;
pub(crate) use store::{Expires, ExpiringStore};
