//! Provider contract and the static candidate list.
//!
//! Providers register themselves with [`CACHE_PROVIDERS`] at compile time:
//!
//! ```ignore
//! #[linkme::distributed_slice(CACHE_PROVIDERS)]
//! static MY_PROVIDER: CacheProviderEntry = CacheProviderEntry {
//!     name: "mine",
//!     description: "My backing store",
//!     priority: 50,
//!     factory: || Arc::new(MyProvider::new()),
//! };
//! ```

use std::fmt;
use std::sync::Arc;

use crate::config::{CacheSettings, DEFAULT_MAX_CAPACITY};
use crate::error::Result;

use super::CacheClient;

/// Arguments handed to `CacheProvider::initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitArgs {
    /// Maximum number of entries per backing store.
    pub max_capacity: u64,
}

impl Default for ProviderInitArgs {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl From<&CacheSettings> for ProviderInitArgs {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            max_capacity: settings.max_capacity,
        }
    }
}

/// A pluggable cache backend.
///
/// The registry constructs each provider once per process and calls
/// `initialize` exactly once before the first `create_client`.
pub trait CacheProvider: Send + Sync + fmt::Debug {
    /// Registered name of this provider.
    fn name(&self) -> &'static str;

    /// One-time setup, such as acquiring the shared backing store.
    fn initialize(&self, args: &ProviderInitArgs) -> Result<()>;

    /// Create a client bound to `cache_id`, creating the logical cache on
    /// first use.
    ///
    /// Safe to call concurrently; concurrent first calls for the same id
    /// collapse onto one logical cache.
    fn create_client(self: Arc<Self>, cache_id: &str) -> Result<Box<dyn CacheClient>>;
}

/// Registry entry for a provider candidate.
pub struct CacheProviderEntry {
    /// Unique provider name (e.g. "partitioned", "cascade").
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Lower wins when no provider is configured by name.
    pub priority: u16,
    /// Construct a fresh, uninitialized provider.
    pub factory: fn() -> Arc<dyn CacheProvider>,
}

impl fmt::Debug for CacheProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheProviderEntry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

#[linkme::distributed_slice]
pub static CACHE_PROVIDERS: [CacheProviderEntry] = [..];

/// List every registered candidate as `(name, description)`, by priority.
pub fn list_providers() -> Vec<(&'static str, &'static str)> {
    let mut entries: Vec<&CacheProviderEntry> = CACHE_PROVIDERS.iter().collect();
    entries.sort_by_key(|e| (e.priority, e.name));
    entries.iter().map(|e| (e.name, e.description)).collect()
}
