//! Provider registry - process-wide entry point for cache clients.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, info};

use crate::config::CacheSettings;
use crate::error::{CacheError, Result};

use super::logging::LoggingCacheClient;
use super::{CACHE_PROVIDERS, CacheClient, CacheProvider, CacheProviderEntry, ProviderInitArgs};

type ProviderCell = Arc<OnceCell<Arc<dyn CacheProvider>>>;

/// Resolves a provider candidate and hands out clients bound to logical caches.
///
/// Each provider is constructed and initialized at most once per registry,
/// however many threads race to create the first client. Providers live as
/// long as the registry; there is no teardown path.
///
/// ## Example
///
/// ```ignore
/// let registry = CacheRegistry::new(CacheSettings::from_env());
///
/// let client = registry.create_client("studies")?;
/// client.put("A100", CacheValue::new(study), &PutOptions::default())?;
/// ```
pub struct CacheRegistry {
    settings: CacheSettings,
    candidates: Vec<&'static CacheProviderEntry>,
    providers: DashMap<&'static str, ProviderCell>,
}

impl CacheRegistry {
    /// Create a registry over every statically registered provider.
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_candidates(settings, CACHE_PROVIDERS.iter())
    }

    /// Create a registry over an explicit candidate list.
    pub fn with_candidates<I>(settings: CacheSettings, candidates: I) -> Self
    where
        I: IntoIterator<Item = &'static CacheProviderEntry>,
    {
        let mut candidates: Vec<_> = candidates.into_iter().collect();
        candidates.sort_by_key(|e| (e.priority, e.name));
        debug!("Cache registry created with {} candidates", candidates.len());

        Self {
            settings,
            candidates,
            providers: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Whether a provider can be selected under the current settings.
    pub fn is_supported(&self) -> bool {
        self.select().is_ok()
    }

    /// The candidate that `create_client` will use.
    fn select(&self) -> Result<&'static CacheProviderEntry> {
        if !self.settings.enabled {
            return Err(CacheError::Unavailable("caching is disabled".into()));
        }

        if let Some(name) = &self.settings.provider {
            return self
                .candidates
                .iter()
                .copied()
                .find(|e| e.name.eq_ignore_ascii_case(name) && self.settings.allows(e.name))
                .ok_or_else(|| {
                    let available: Vec<&str> = self.candidates.iter().map(|e| e.name).collect();
                    CacheError::Unavailable(format!(
                        "provider '{}' is not available (registered: {:?})",
                        name, available
                    ))
                });
        }

        self.candidates
            .iter()
            .copied()
            .find(|e| self.settings.allows(e.name))
            .ok_or_else(|| CacheError::Unavailable("no cache provider candidates enabled".into()))
    }

    /// Get the selected provider, constructing and initializing it on first use.
    pub fn provider(&self) -> Result<Arc<dyn CacheProvider>> {
        let entry = self.select()?;

        // Clone the cell out so the map guard is not held during initialize.
        let cell = self
            .providers
            .entry(entry.name)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let provider = cell.get_or_try_init(|| {
            let provider = (entry.factory)();
            provider.initialize(&ProviderInitArgs::from(&self.settings))?;
            info!("Cache provider '{}' initialized", entry.name);
            Ok::<_, CacheError>(provider)
        })?;

        Ok(Arc::clone(provider))
    }

    /// Create a client bound to `cache_id`.
    ///
    /// The client is wrapped in a [`LoggingCacheClient`] when the configured
    /// log level is enabled right now.
    pub fn create_client(&self, cache_id: &str) -> Result<Box<dyn CacheClient>> {
        if cache_id.is_empty() {
            return Err(CacheError::empty("cache_id"));
        }

        let client = self.provider()?.create_client(cache_id)?;
        debug!("Created cache client for '{}'", cache_id);

        let level = self.settings.log_level;
        if LoggingCacheClient::enabled(level) {
            Ok(Box::new(LoggingCacheClient::new(client, level)))
        } else {
            Ok(client)
        }
    }

    /// Names of providers constructed so far.
    pub fn active_providers(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|cell| cell.value().get().is_some())
            .map(|cell| *cell.key())
            .collect()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("candidates", &self.candidates)
            .field("active_providers", &self.active_providers())
            .finish()
    }
}

/// The process-wide registry, configured from the environment on first use.
static GLOBAL: Lazy<CacheRegistry> = Lazy::new(|| CacheRegistry::new(CacheSettings::from_env()));

/// Process-wide registry.
pub fn global() -> &'static CacheRegistry {
    &GLOBAL
}

/// Create a client bound to `cache_id` from the process-wide registry.
pub fn create_client(cache_id: &str) -> Result<Box<dyn CacheClient>> {
    GLOBAL.create_client(cache_id)
}

/// Whether the process-wide registry has a usable provider.
pub fn is_supported() -> bool {
    GLOBAL.is_supported()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientLogLevel;

    fn settings() -> CacheSettings {
        CacheSettings::default().log_level(ClientLogLevel::Off)
    }

    #[test]
    fn picks_the_highest_priority_candidate() {
        let registry = CacheRegistry::new(settings());
        assert_eq!(registry.provider().unwrap().name(), "partitioned");
    }

    #[test]
    fn configured_name_wins() {
        let registry = CacheRegistry::new(settings().provider("CASCADE"));
        assert_eq!(registry.provider().unwrap().name(), "cascade");
        assert_eq!(registry.settings().provider.as_deref(), Some("CASCADE"));
    }

    #[test]
    fn disabled_candidates_are_skipped() {
        let registry = CacheRegistry::new(settings().disable_provider("partitioned"));
        assert_eq!(registry.provider().unwrap().name(), "cascade");

        let registry = CacheRegistry::new(
            settings()
                .disable_provider("partitioned")
                .disable_provider("cascade"),
        );
        assert!(!registry.is_supported());
        assert!(matches!(
            registry.create_client("Foo"),
            Err(CacheError::Unavailable(_))
        ));
    }

    #[test]
    fn unknown_provider_lists_registered_names() {
        let registry = CacheRegistry::new(settings().provider("redis"));
        let err = registry.provider().unwrap_err().to_string();
        assert!(err.contains("redis"));
        assert!(err.contains("partitioned"));
    }

    #[test]
    fn provider_is_shared() {
        let registry = CacheRegistry::new(settings());
        let a = registry.provider().unwrap();
        let b = registry.provider().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.active_providers(), vec!["partitioned"]);
    }

    #[test]
    fn empty_cache_id_is_rejected() {
        let registry = CacheRegistry::new(settings());
        assert!(matches!(
            registry.create_client(""),
            Err(CacheError::InvalidArgument { name: "cache_id", .. })
        ));
    }
}
