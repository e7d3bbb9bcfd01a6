//! Cascade-invalidation cache provider.
//!
//! All logical caches share one flat key space organised as a dependency
//! chain `root(cache) -> anchor(cache, region) -> item(cache, region, key)`.
//! Each link records the generation of its parent at write time, so removing
//! and recreating a root or anchor orphans everything beneath it in O(1).
//! Orphans, items and anchors alike, are treated as misses and deleted when
//! next observed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::cache::{
    CACHE_PROVIDERS, CacheClient, CacheProvider, CacheProviderEntry, CacheValue, Expiration,
    Expires, ExpiringStore, GetOptions, ProviderInitArgs, PutOptions, RemoveOptions, region_name,
};
use crate::error::{CacheError, Result, ensure_key};

const NAME: &str = "cascade";

/// Key in the shared key space.
///
/// Displays as `cache`, `cache:region` and `cache:region:key`; kept typed so
/// ids containing `:` cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CascadeKey {
    Root(String),
    Anchor(String, String),
    Item(String, String, String),
}

impl fmt::Display for CascadeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(cache) => write!(f, "{cache}"),
            Self::Anchor(cache, region) => write!(f, "{cache}:{region}"),
            Self::Item(cache, region, key) => write!(f, "{cache}:{region}:{key}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RootLink {
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct AnchorLink {
    generation: u64,
    root_generation: u64,
}

#[derive(Debug, Clone)]
struct ItemEntry {
    value: CacheValue,
    expiration: Expiration,
    anchor_generation: u64,
}

impl Expires for RootLink {
    fn expiration(&self) -> Option<Expiration> {
        None
    }
}

impl Expires for AnchorLink {
    fn expiration(&self) -> Option<Expiration> {
        None
    }
}

impl Expires for ItemEntry {
    fn expiration(&self) -> Option<Expiration> {
        Some(self.expiration)
    }
}

/// Shared backing store, split by link kind. Roots and anchors never expire
/// or get evicted; items are bounded by capacity.
///
/// Anchor writes go through `upsert_with`/`remove_if`, which run one at a time
/// per key.
#[derive(Debug)]
struct Backing {
    roots: ExpiringStore<CascadeKey, RootLink>,
    anchors: ExpiringStore<CascadeKey, AnchorLink>,
    items: ExpiringStore<CascadeKey, ItemEntry>,
    generations: AtomicU64,
}

impl Backing {
    fn new(max_capacity: u64) -> Self {
        Self {
            roots: ExpiringStore::unbounded(),
            anchors: ExpiringStore::unbounded(),
            items: ExpiringStore::new(max_capacity),
            generations: AtomicU64::new(1),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    /// Current root generation, writing a root if there is none.
    fn root(&self, cache_id: &str) -> u64 {
        self.roots
            .get_or_insert_with(CascadeKey::Root(cache_id.to_string()), || RootLink {
                generation: self.next_generation(),
            })
            .generation
    }

    /// Anchor of `region` if it belongs to the current root.
    ///
    /// An anchor left behind by an earlier root is deleted.
    fn anchor(&self, cache_id: &str, region: &str) -> Option<AnchorLink> {
        let key = CascadeKey::Anchor(cache_id.to_string(), region.to_string());
        let anchor = self.anchors.get(&key)?;
        let root = self.root(cache_id);
        if anchor.root_generation == root {
            return Some(anchor);
        }

        if self.anchors.remove_if(key, |current| current.root_generation != root) {
            debug!("Dropped stale anchor '{}:{}'", cache_id, region);
        }
        None
    }

    /// Anchor generation valid under the current root, creating or
    /// replacing the anchor as needed. Concurrent callers agree on one anchor.
    fn live_anchor(&self, cache_id: &str, region: &str) -> u64 {
        let root = self.root(cache_id);
        let key = CascadeKey::Anchor(cache_id.to_string(), region.to_string());
        let anchor = self.anchors.upsert_with(key, |current| match current {
            Some(anchor) if anchor.root_generation == root => anchor,
            _ => {
                debug!("Writing anchor '{}:{}'", cache_id, region);
                AnchorLink {
                    generation: self.next_generation(),
                    root_generation: root,
                }
            }
        });
        anchor.generation
    }

    /// Whether an item written under `anchor_generation` is still reachable.
    fn reachable(&self, cache_id: &str, region: &str, anchor_generation: u64) -> bool {
        self.anchor(cache_id, region)
            .is_some_and(|anchor| anchor.generation == anchor_generation)
    }

    fn clear_region(&self, cache_id: &str, region: &str) {
        let root = self.root(cache_id);
        let key = CascadeKey::Anchor(cache_id.to_string(), region.to_string());
        self.anchors.upsert_with(key, |_| AnchorLink {
            generation: self.next_generation(),
            root_generation: root,
        });
    }

    fn clear_cache(&self, cache_id: &str) {
        self.roots.insert(
            CascadeKey::Root(cache_id.to_string()),
            RootLink {
                generation: self.next_generation(),
            },
        );
    }
}

/// Provider relying on dependency-chain invalidation over a single store.
#[derive(Debug, Default)]
pub struct CascadeCacheProvider {
    backing: OnceCell<Arc<Backing>>,
}

impl CascadeCacheProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheProvider for CascadeCacheProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, args: &ProviderInitArgs) -> Result<()> {
        self.backing.get_or_init(|| Arc::new(Backing::new(args.max_capacity)));
        info!("Cascade cache provider initialized (capacity {})", args.max_capacity);
        Ok(())
    }

    fn create_client(self: Arc<Self>, cache_id: &str) -> Result<Box<dyn CacheClient>> {
        if cache_id.is_empty() {
            return Err(CacheError::empty("cache_id"));
        }
        let backing = self
            .backing
            .get()
            .ok_or(CacheError::NotInitialized(NAME))?;

        // The root is permanent; writing it here makes the cache exist.
        backing.root(cache_id);
        Ok(Box::new(CascadeCacheClient {
            backing: Arc::clone(backing),
            cache_id: cache_id.to_string(),
        }))
    }
}

/// Client bound to one logical cache in the shared cascade store.
#[derive(Debug)]
pub struct CascadeCacheClient {
    backing: Arc<Backing>,
    cache_id: String,
}

impl CascadeCacheClient {
    fn item_key(&self, region: &str, key: &str) -> CascadeKey {
        CascadeKey::Item(self.cache_id.clone(), region.to_string(), key.to_string())
    }
}

impl CacheClient for CascadeCacheClient {
    fn cache_id(&self) -> &str {
        &self.cache_id
    }

    fn get(&self, key: &str, options: &GetOptions) -> Result<Option<CacheValue>> {
        ensure_key(key)?;
        let region = options.region();
        let item_key = self.item_key(region, key);

        let Some(item) = self.backing.items.get(&item_key) else {
            return Ok(None);
        };

        if self
            .backing
            .reachable(&self.cache_id, region, item.anchor_generation)
        {
            return Ok(Some(item.value));
        }

        // Only the orphan goes; a replacement written since is kept.
        let orphaned = item.anchor_generation;
        debug!("Dropping orphaned item '{}'", item_key);
        self.backing
            .items
            .remove_if(item_key, |current| current.anchor_generation == orphaned);
        Ok(None)
    }

    fn put(&self, key: &str, value: CacheValue, options: &PutOptions) -> Result<()> {
        ensure_key(key)?;
        let region = options.region();
        let anchor_generation = self.backing.live_anchor(&self.cache_id, region);
        self.backing.items.insert(
            self.item_key(region, key),
            ItemEntry {
                value,
                expiration: options.policy(),
                anchor_generation,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str, options: &RemoveOptions) -> Result<()> {
        ensure_key(key)?;
        self.backing
            .items
            .invalidate(&self.item_key(options.region(), key));
        Ok(())
    }

    fn region_exists(&self, region: Option<&str>) -> Result<bool> {
        let region = region_name(region);
        if region.is_empty() {
            return Ok(true);
        }
        Ok(self.backing.anchor(&self.cache_id, region).is_some())
    }

    fn clear_region(&self, region: Option<&str>) -> Result<()> {
        self.backing.clear_region(&self.cache_id, region_name(region));
        Ok(())
    }

    fn clear_cache(&self) -> Result<()> {
        self.backing.clear_cache(&self.cache_id);
        Ok(())
    }
}

#[linkme::distributed_slice(CACHE_PROVIDERS)]
static CASCADE_PROVIDER: CacheProviderEntry = CacheProviderEntry {
    name: NAME,
    description: "Single key space with root/region/item dependency chain",
    priority: 20,
    factory: || Arc::new(CascadeCacheProvider::new()),
};

#[cfg(test)]
mod tests {
    use super::*;

    fn client(cache_id: &str) -> (Arc<CascadeCacheProvider>, Box<dyn CacheClient>) {
        let provider = Arc::new(CascadeCacheProvider::new());
        provider.initialize(&ProviderInitArgs::default()).unwrap();
        let client = Arc::clone(&provider).create_client(cache_id).unwrap();
        (provider, client)
    }

    #[test]
    fn keys_display_as_colon_paths() {
        assert_eq!(CascadeKey::Root("Foo".into()).to_string(), "Foo");
        assert_eq!(
            CascadeKey::Anchor("Foo".into(), "R1".into()).to_string(),
            "Foo:R1"
        );
        assert_eq!(
            CascadeKey::Item("Foo".into(), "".into(), "k".into()).to_string(),
            "Foo::k"
        );
    }

    #[test]
    fn colon_ids_do_not_collide() {
        let (provider, ab) = client("a:b");
        let a = Arc::clone(&provider).create_client("a").unwrap();

        a.put("k", CacheValue::new(1), &PutOptions::default().with_region("b"))
            .unwrap();
        ab.clear_cache().unwrap();

        let hit = a.get("k", &GetOptions::new().with_region("b")).unwrap();
        assert_eq!(hit.unwrap().downcast_ref::<i32>(), Some(&1));
    }

    #[test]
    fn orphaned_items_are_deleted_on_read() {
        let (provider, client) = client("Foo");
        client
            .put("k", CacheValue::new("v"), &PutOptions::default().with_region("R1"))
            .unwrap();
        client.clear_region(Some("R1")).unwrap();

        let backing = provider.backing.get().unwrap();
        let key = CascadeKey::Item("Foo".into(), "R1".into(), "k".into());
        assert!(backing.items.contains(&key));

        assert!(client.get("k", &GetOptions::new().with_region("R1")).unwrap().is_none());
        assert!(!backing.items.contains(&key));
    }

    #[test]
    fn cleared_region_keeps_its_anchor() {
        let (_provider, client) = client("Foo");
        assert!(!client.region_exists(Some("R1")).unwrap());

        client
            .put("k", CacheValue::new(1), &PutOptions::default().with_region("R1"))
            .unwrap();
        client.clear_region(Some("R1")).unwrap();
        assert!(client.region_exists(Some("R1")).unwrap());

        client.clear_cache().unwrap();
        assert!(!client.region_exists(Some("R1")).unwrap());
        assert!(client.region_exists(None).unwrap());
    }

    #[test]
    fn requires_initialize() {
        let provider = Arc::new(CascadeCacheProvider::new());
        assert!(matches!(
            provider.create_client("Foo"),
            Err(CacheError::NotInitialized("cascade"))
        ));
    }

    #[test]
    fn stale_anchors_are_dropped_when_observed() {
        let (provider, client) = client("Foo");
        let put = PutOptions::default().with_region("R1");
        client.put("k", CacheValue::new(1), &put).unwrap();

        let backing = provider.backing.get().unwrap();
        let anchor = CascadeKey::Anchor("Foo".into(), "R1".into());
        assert!(backing.anchors.contains(&anchor));

        client.clear_cache().unwrap();
        assert!(backing.anchors.contains(&anchor));

        assert!(client.get("k", &GetOptions::new().with_region("R1")).unwrap().is_none());
        assert!(!backing.anchors.contains(&anchor));

        client.put("k", CacheValue::new(2), &put).unwrap();
        client.clear_cache().unwrap();
        assert!(!client.region_exists(Some("R1")).unwrap());
        assert!(!backing.anchors.contains(&anchor));
    }

    #[test]
    fn racing_writers_share_one_anchor() {
        use std::sync::Barrier;
        use std::thread;

        const THREADS: usize = 16;

        let (provider, _client) = client("Foo");
        let backing = provider.backing.get().unwrap();
        let barrier = Barrier::new(THREADS);

        let generations: Vec<u64> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        backing.live_anchor("Foo", "R1")
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(generations.iter().all(|g| *g == generations[0]));
        assert!(backing.reachable("Foo", "R1", generations[0]));
    }
}
