//! Regioncache - multi-tenant in-memory caching.
//!
//! Named logical caches, each partitioned into regions, each region holding
//! independently expiring entries, with whole-region and whole-cache
//! invalidation and pluggable backing providers.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `cache` - Client/provider contracts, registry, logging decorator
//! - `providers` - Partitioned and cascade-invalidation backends (Moka)
//! - `error` - Error taxonomy

pub mod cache;
pub mod config;
pub mod error;
pub mod providers;

pub use cache::{
    CacheClient, CacheProvider, CacheRegistry, CacheValue, GetOptions, PutOptions, RemoveOptions,
    create_client, is_supported,
};
pub use config::CacheSettings;
pub use error::{CacheError, Result};
