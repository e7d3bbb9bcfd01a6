//! Expiring store wrapper around Moka.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;
use moka::{Entry, Expiry};

use super::Expiration;

/// Values held by an [`ExpiringStore`] declare their own lifetime.
pub(crate) trait Expires {
    /// `None` means the entry never expires.
    fn expiration(&self) -> Option<Expiration>;
}

/// Per-entry expiry: absolute deadlines are fixed at write time, sliding
/// deadlines restart on every read.
struct PerEntryExpiry;

impl<K, V: Expires> Expiry<K, V> for PerEntryExpiry {
    fn expire_after_create(&self, _key: &K, value: &V, _created_at: Instant) -> Option<Duration> {
        value.expiration().map(|e| e.duration())
    }

    fn expire_after_read(
        &self,
        _key: &K,
        value: &V,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        match value.expiration() {
            Some(Expiration::Sliding(d)) => Some(d),
            _ => duration_until_expiry,
        }
    }

    fn expire_after_update(
        &self,
        _key: &K,
        value: &V,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // A replacing put starts a fresh lifetime from its own options.
        value.expiration().map(|e| e.duration())
    }
}

/// A thread-safe, clone-friendly store with per-entry expiration.
///
/// Cloning is cheap and shares the same underlying cache.
pub(crate) struct ExpiringStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Expires + Send + Sync + 'static,
{
    inner: Arc<Cache<K, V>>,
}

// Manual Clone implementation that doesn't require K: Clone, V: Clone
impl<K, V> Clone for ExpiringStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Expires + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> ExpiringStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Expires + Send + Sync + 'static,
{
    /// Create a new store holding at most `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryExpiry)
            .build();

        Self {
            inner: Arc::new(cache),
        }
    }

    /// Create a store that never evicts for size.
    ///
    /// Used for structural entries that must only disappear when removed.
    pub fn unbounded() -> Self {
        let cache = Cache::builder().expire_after(PerEntryExpiry).build();

        Self {
            inner: Arc::new(cache),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Get a value if present and not expired. Renews sliding entries.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    /// Get the value or insert the one produced by `init`.
    ///
    /// Concurrent callers for the same key run `init` at most once and all
    /// observe the winner's value.
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.inner.get_with(key, init)
    }

    /// Replace the value with the output of `f`, which sees the current value.
    ///
    /// Calls for the same key through `upsert_with` and `remove_if` run one at
    /// a time, so `f` never observes a stale value.
    pub fn upsert_with<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce(Option<V>) -> V,
    {
        self.inner
            .entry(key)
            .and_upsert_with(|current| f(current.map(Entry::into_value)))
            .into_value()
    }

    /// Remove the entry if `predicate` holds for its current value.
    ///
    /// Returns whether an entry was removed.
    pub fn remove_if<F>(&self, key: K, predicate: F) -> bool
    where
        F: FnOnce(&V) -> bool,
    {
        let result = self.inner.entry(key).and_compute_with(|current| match current {
            Some(entry) if predicate(entry.value()) => Op::Remove,
            _ => Op::Nop,
        });
        matches!(result, CompResult::Removed(_))
    }

    #[cfg(test)]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(key)
    }

    pub fn invalidate<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.invalidate(key);
    }

    /// Remove all entries.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl<K, V> std::fmt::Debug for ExpiringStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Expires + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Slot(&'static str, Option<Expiration>);

    impl Expires for Slot {
        fn expiration(&self) -> Option<Expiration> {
            self.1
        }
    }

    #[test]
    fn absolute_entries_expire_even_when_read() {
        let store: ExpiringStore<String, Slot> = ExpiringStore::new(100);
        let ttl = Some(Expiration::Absolute(Duration::from_millis(100)));
        store.insert("k".into(), Slot("v", ttl));

        sleep(Duration::from_millis(50));
        assert!(store.get("k").is_some());
        sleep(Duration::from_millis(100));
        assert!(store.get("k").is_none());
    }

    #[test]
    fn sliding_entries_survive_while_read() {
        let store: ExpiringStore<String, Slot> = ExpiringStore::new(100);
        let ttl = Some(Expiration::Sliding(Duration::from_millis(200)));
        store.insert("k".into(), Slot("v", ttl));

        for _ in 0..6 {
            sleep(Duration::from_millis(60));
            assert!(store.get("k").is_some());
        }
        sleep(Duration::from_millis(300));
        assert!(store.get("k").is_none());
    }

    #[test]
    fn unexpiring_entries_stay_until_removed() {
        let store: ExpiringStore<String, Slot> = ExpiringStore::unbounded();
        store.insert("root".into(), Slot("root", None));
        sleep(Duration::from_millis(20));
        assert_eq!(store.get("root"), Some(Slot("root", None)));

        store.invalidate_all();
        assert!(store.get("root").is_none());
    }

    #[test]
    fn get_or_insert_keeps_the_first_value() {
        let store: ExpiringStore<String, Slot> = ExpiringStore::new(10);
        let first = store.get_or_insert_with("k".into(), || Slot("first", None));
        let second = store.get_or_insert_with("k".into(), || Slot("second", None));
        assert_eq!(first, second);
        assert_eq!(first.0, "first");

        store.invalidate("k");
        assert!(!store.contains("k"));
    }

    #[test]
    fn upsert_sees_the_current_value() {
        let store: ExpiringStore<String, Slot> = ExpiringStore::unbounded();
        let first = store.upsert_with("k".into(), |current| {
            assert!(current.is_none());
            Slot("first", None)
        });
        assert_eq!(first.0, "first");

        let kept =
            store.upsert_with("k".into(), |current| current.unwrap_or(Slot("other", None)));
        assert_eq!(kept.0, "first");
    }

    #[test]
    fn concurrent_upserts_agree_on_one_value() {
        use std::sync::Barrier;
        use std::sync::atomic::{AtomicUsize, Ordering};

        const THREADS: usize = 16;
        const NAMES: [&str; THREADS] = [
            "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p",
        ];

        let store: ExpiringStore<String, Slot> = ExpiringStore::unbounded();
        let barrier = Barrier::new(THREADS);
        let created = AtomicUsize::new(0);

        let seen: Vec<Slot> = std::thread::scope(|scope| {
            let handles: Vec<_> = NAMES
                .into_iter()
                .map(|name| {
                    let (store, barrier, created) = (&store, &barrier, &created);
                    scope.spawn(move || {
                        barrier.wait();
                        store.upsert_with("k".into(), |current| {
                            current.unwrap_or_else(|| {
                                created.fetch_add(1, Ordering::SeqCst);
                                Slot(name, None)
                            })
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(seen.iter().all(|slot| *slot == seen[0]));
    }

    #[test]
    fn remove_if_checks_the_current_value() {
        let store: ExpiringStore<String, Slot> = ExpiringStore::unbounded();
        store.insert("k".into(), Slot("keep", None));

        assert!(!store.remove_if("k".into(), |slot| slot.0 == "stale"));
        assert!(store.contains("k"));
        assert!(store.remove_if("k".into(), |slot| slot.0 == "keep"));
        assert!(!store.contains("k"));
        assert!(!store.remove_if("missing".into(), |_| true));
    }
}
