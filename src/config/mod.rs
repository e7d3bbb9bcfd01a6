//! Configuration for the cache subsystem.
//!
//! Loads settings from environment variables (and a `.env` file if present).

use std::env;

use serde::Deserialize;
use tracing::warn;

/// Default number of entries a single backing store may hold.
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Level at which the logging client emits, or `Off` to never decorate.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientLogLevel {
    Off,
    Error,
    Warn,
    Info,
    #[default]
    Debug,
    Trace,
}

impl ClientLogLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

/// Cache subsystem settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheSettings {
    /// Master switch. When false no provider is ever selected.
    pub enabled: bool,

    /// Provider to use by name. When unset the highest-priority enabled
    /// candidate wins.
    pub provider: Option<String>,

    /// Candidates that must never be selected.
    pub disabled_providers: Vec<String>,

    /// Maximum number of entries per backing store.
    pub max_capacity: u64,

    /// Verbosity of the logging client decorator.
    pub log_level: ClientLogLevel,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: None,
            disabled_providers: Vec::new(),
            max_capacity: DEFAULT_MAX_CAPACITY,
            log_level: ClientLogLevel::default(),
        }
    }
}

impl CacheSettings {
    /// Load settings from environment variables.
    ///
    /// Malformed values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = match lookup("CACHE_ENABLED") {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!("Ignoring invalid CACHE_ENABLED value: {}", raw);
                defaults.enabled
            }),
            None => defaults.enabled,
        };

        let provider = lookup("CACHE_PROVIDER")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        // Parse disabled providers (comma-separated)
        let disabled_providers = lookup("CACHE_DISABLED_PROVIDERS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let max_capacity = match lookup("CACHE_MAX_CAPACITY") {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!("Ignoring invalid CACHE_MAX_CAPACITY value: {}", raw);
                defaults.max_capacity
            }),
            None => defaults.max_capacity,
        };

        let log_level = match lookup("CACHE_LOG_LEVEL") {
            Some(raw) => ClientLogLevel::parse(&raw).unwrap_or_else(|| {
                warn!("Ignoring invalid CACHE_LOG_LEVEL value: {}", raw);
                defaults.log_level
            }),
            None => defaults.log_level,
        };

        Self {
            enabled,
            provider,
            disabled_providers,
            max_capacity,
            log_level,
        }
    }

    /// Pin the provider by name (builder pattern).
    #[must_use]
    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    /// Exclude a provider from selection.
    #[must_use]
    pub fn disable_provider(mut self, name: impl Into<String>) -> Self {
        self.disabled_providers.push(name.into());
        self
    }

    /// Set max capacity per backing store.
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Set the logging decorator verbosity.
    #[must_use]
    pub fn log_level(mut self, level: ClientLogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Turn caching off entirely.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the named provider may be selected.
    pub fn allows(&self, name: &str) -> bool {
        !self
            .disabled_providers
            .iter()
            .any(|d| d.eq_ignore_ascii_case(name))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = CacheSettings::from_lookup(|_| None);
        assert_eq!(settings, CacheSettings::default());
        assert!(settings.enabled);
        assert_eq!(settings.max_capacity, DEFAULT_MAX_CAPACITY);
        assert_eq!(settings.log_level, ClientLogLevel::Debug);
    }

    #[test]
    fn reads_every_variable() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("CACHE_ENABLED", "yes"),
            ("CACHE_PROVIDER", " Cascade "),
            ("CACHE_DISABLED_PROVIDERS", "partitioned, ,Other"),
            ("CACHE_MAX_CAPACITY", "500"),
            ("CACHE_LOG_LEVEL", "TRACE"),
        ]));

        assert!(settings.enabled);
        assert_eq!(settings.provider.as_deref(), Some("cascade"));
        assert_eq!(settings.disabled_providers, vec!["partitioned", "other"]);
        assert_eq!(settings.max_capacity, 500);
        assert_eq!(settings.log_level, ClientLogLevel::Trace);
        assert!(!settings.allows("Partitioned"));
        assert!(settings.allows("cascade"));
    }

    #[test]
    fn malformed_values_fall_back() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("CACHE_ENABLED", "maybe"),
            ("CACHE_MAX_CAPACITY", "lots"),
            ("CACHE_LOG_LEVEL", "loud"),
        ]));
        assert_eq!(settings, CacheSettings::default());
    }

    #[test]
    fn zero_disables_caching() {
        let settings = CacheSettings::from_lookup(lookup_from(&[("CACHE_ENABLED", "0")]));
        assert!(!settings.enabled);
    }

    #[test]
    fn deserializes_partial_documents() {
        let settings: CacheSettings =
            serde_json::from_str(r#"{"provider":"cascade","log_level":"off"}"#).unwrap();
        assert_eq!(settings.provider.as_deref(), Some("cascade"));
        assert_eq!(settings.log_level, ClientLogLevel::Off);
        assert_eq!(settings.max_capacity, DEFAULT_MAX_CAPACITY);
    }
}
