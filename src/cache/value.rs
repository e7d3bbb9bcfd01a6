//! Opaque cached values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Anything that can be stored in a cache.
///
/// Implemented for every `'static` type that is `Debug + Send + Sync`; the
/// `Debug` form is what the logging client prints on a hit.
pub trait Cacheable: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T> Cacheable for T
where
    T: Any + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A type-erased, shared cache value.
///
/// Cloning is cheap and shares the same allocation.
#[derive(Clone)]
pub struct CacheValue(Arc<dyn Cacheable>);

impl CacheValue {
    pub fn new<T: Cacheable>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wrap an already shared value without copying it.
    pub fn from_arc<T: Cacheable>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Borrow the payload as `T` if that is what was stored.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        // Explicit deref: `Arc<dyn Cacheable>` is itself `Cacheable`.
        <dyn Cacheable>::as_any(&*self.0).downcast_ref::<T>()
    }

    /// Get a shared handle to the payload as `T` if that is what was stored.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Cacheable::into_any(Arc::clone(&self.0)).downcast::<T>().ok()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// True when both handles point at the same stored value.
    pub fn ptr_eq(&self, other: &CacheValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
