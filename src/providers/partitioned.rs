//! Partitioned cache provider.
//!
//! Every `(cache_id, region)` pair gets its own physical sub-store. Clearing a
//! region drops its sub-store; clearing a cache drops all of them and
//! reinstalls an empty default region.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::cache::{
    CACHE_PROVIDERS, CacheClient, CacheProvider, CacheProviderEntry, CacheValue, Expiration,
    Expires, ExpiringStore, GetOptions, ProviderInitArgs, PutOptions, RemoveOptions,
};
use crate::error::{CacheError, Result, ensure_key};

const NAME: &str = "partitioned";
const DEFAULT_REGION: &str = "";

/// Item as held in a region sub-store.
#[derive(Debug, Clone)]
struct StoredItem {
    value: CacheValue,
    expiration: Expiration,
}

impl Expires for StoredItem {
    fn expiration(&self) -> Option<Expiration> {
        Some(self.expiration)
    }
}

type RegionStore = ExpiringStore<String, StoredItem>;

/// One logical cache: region name -> sub-store.
#[derive(Debug)]
struct PartitionedCache {
    id: String,
    max_capacity: u64,
    regions: DashMap<String, RegionStore>,
}

impl PartitionedCache {
    fn new(id: &str, max_capacity: u64) -> Self {
        let cache = Self {
            id: id.to_string(),
            max_capacity,
            regions: DashMap::new(),
        };
        cache.install_default();
        cache
    }

    fn install_default(&self) {
        self.regions
            .entry(DEFAULT_REGION.to_string())
            .or_insert_with(|| RegionStore::new(self.max_capacity));
    }

    /// Look up a region without creating it. The map guard is released
    /// before the sub-store is used.
    fn region(&self, name: &str) -> Option<RegionStore> {
        self.regions.get(name).map(|store| store.value().clone())
    }

    fn region_or_create(&self, name: &str) -> RegionStore {
        if let Some(store) = self.region(name) {
            return store;
        }
        self.regions
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating region '{}' in cache '{}'", name, self.id);
                RegionStore::new(self.max_capacity)
            })
            .value()
            .clone()
    }

    fn discard_region(&self, name: &str) {
        if let Some((_, old)) = self.regions.remove(name) {
            old.invalidate_all();
        }
        if name == DEFAULT_REGION {
            self.install_default();
        }
    }

    fn discard_all(&self) {
        let mut discarded = Vec::new();
        self.regions.retain(|_, store| {
            discarded.push(store.clone());
            false
        });
        self.install_default();

        debug!("Discarded {} regions of cache '{}'", discarded.len(), self.id);
        for store in discarded {
            store.invalidate_all();
        }
    }
}

/// Provider keeping an independent sub-store per region.
#[derive(Debug, Default)]
pub struct PartitionedCacheProvider {
    max_capacity: OnceCell<u64>,
    caches: DashMap<String, Arc<PartitionedCache>>,
}

impl PartitionedCacheProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn logical_cache(&self, cache_id: &str) -> Result<Arc<PartitionedCache>> {
        let max_capacity = *self.max_capacity.get().ok_or(CacheError::NotInitialized(NAME))?;

        if let Some(cache) = self.caches.get(cache_id) {
            return Ok(Arc::clone(&cache));
        }

        let cache = self
            .caches
            .entry(cache_id.to_string())
            .or_insert_with(|| {
                debug!("Creating logical cache '{}'", cache_id);
                Arc::new(PartitionedCache::new(cache_id, max_capacity))
            });
        Ok(Arc::clone(&cache))
    }
}

impl CacheProvider for PartitionedCacheProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, args: &ProviderInitArgs) -> Result<()> {
        // A second call keeps the first capacity.
        let capacity = *self.max_capacity.get_or_init(|| args.max_capacity);
        info!("Partitioned cache provider initialized (capacity {} per region)", capacity);
        Ok(())
    }

    fn create_client(self: Arc<Self>, cache_id: &str) -> Result<Box<dyn CacheClient>> {
        if cache_id.is_empty() {
            return Err(CacheError::empty("cache_id"));
        }
        let cache = self.logical_cache(cache_id)?;
        Ok(Box::new(PartitionedCacheClient { cache }))
    }
}

/// Client bound to one partitioned logical cache.
#[derive(Debug)]
pub struct PartitionedCacheClient {
    cache: Arc<PartitionedCache>,
}

impl CacheClient for PartitionedCacheClient {
    fn cache_id(&self) -> &str {
        &self.cache.id
    }

    fn get(&self, key: &str, options: &GetOptions) -> Result<Option<CacheValue>> {
        ensure_key(key)?;
        Ok(self
            .cache
            .region(options.region())
            .and_then(|store| store.get(key))
            .map(|item| item.value))
    }

    fn put(&self, key: &str, value: CacheValue, options: &PutOptions) -> Result<()> {
        ensure_key(key)?;
        let store = self.cache.region_or_create(options.region());
        store.insert(
            key.to_string(),
            StoredItem {
                value,
                expiration: options.policy(),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str, options: &RemoveOptions) -> Result<()> {
        ensure_key(key)?;
        if let Some(store) = self.cache.region(options.region()) {
            store.invalidate(key);
        }
        Ok(())
    }

    fn region_exists(&self, region: Option<&str>) -> Result<bool> {
        let name = crate::cache::region_name(region);
        Ok(name == DEFAULT_REGION || self.cache.regions.contains_key(name))
    }

    fn clear_region(&self, region: Option<&str>) -> Result<()> {
        self.cache.discard_region(crate::cache::region_name(region));
        Ok(())
    }

    fn clear_cache(&self) -> Result<()> {
        self.cache.discard_all();
        Ok(())
    }
}

#[linkme::distributed_slice(CACHE_PROVIDERS)]
static PARTITIONED_PROVIDER: CacheProviderEntry = CacheProviderEntry {
    name: NAME,
    description: "Independent in-memory sub-store per region",
    priority: 10,
    factory: || Arc::new(PartitionedCacheProvider::new()),
};
