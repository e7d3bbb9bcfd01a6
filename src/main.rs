//! Regioncache smoke runner.
//!
//! Creates a client from the environment-configured provider and walks it
//! through put, get, region clear and cache clear, logging each step.

use std::env;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use regioncache::cache::list_providers;
use regioncache::{CacheRegistry, CacheSettings, CacheValue, GetOptions, PutOptions};

fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("regioncache=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting regioncache smoke run...");

    let registry = CacheRegistry::new(CacheSettings::from_env());
    info!("Configuration loaded: {:?}", registry.settings());
    for (name, description) in list_providers() {
        info!("Provider candidate '{}': {}", name, description);
    }

    let provider = registry.provider().context("no cache provider available")?;
    info!("Using provider '{}'", provider.name());

    let cache_id = env::var("CACHE_DEMO_ID").unwrap_or_else(|_| "demo".to_string());
    let client = registry.create_client(&cache_id)?;

    let put = PutOptions::new(Duration::from_secs(30)).with_region("smoke");
    let get = GetOptions::new().with_region("smoke");

    client.put("greeting", CacheValue::new(String::from("hello")), &put)?;
    client.put("answer", CacheValue::new(42_u32), &PutOptions::default())?;

    match client.get("greeting", &get)? {
        Some(v) if v.downcast_ref::<String>().is_some_and(|s| s == "hello") => {
            info!("Round trip ok")
        }
        other => bail!("unexpected value after put: {:?}", other),
    }

    client.clear_region(Some("smoke"))?;
    if client.get("greeting", &get)?.is_some() {
        bail!("region clear left 'greeting' reachable");
    }
    if client.get("answer", &GetOptions::default())?.is_none() {
        bail!("region clear removed an item from the default region");
    }
    info!("Region clear ok");

    client.clear_cache()?;
    if client.get("answer", &GetOptions::default())?.is_some() {
        bail!("cache clear left 'answer' reachable");
    }
    info!("Cache clear ok");

    info!("Smoke run for '{}' finished", cache_id);
    Ok(())
}
