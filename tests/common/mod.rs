//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

use regioncache::providers::{CascadeCacheProvider, PartitionedCacheProvider};
use regioncache::cache::ProviderInitArgs;
use regioncache::{CacheClient, CacheProvider};

/// Fresh, initialized instances of every built-in provider.
pub fn providers() -> Vec<Arc<dyn CacheProvider>> {
    let providers: Vec<Arc<dyn CacheProvider>> = vec![
        Arc::new(PartitionedCacheProvider::new()),
        Arc::new(CascadeCacheProvider::new()),
    ];
    for provider in &providers {
        provider
            .initialize(&ProviderInitArgs::default())
            .expect("initialize provider");
    }
    providers
}

/// One client per built-in provider, each bound to `cache_id`.
pub fn clients(cache_id: &str) -> Vec<(&'static str, Box<dyn CacheClient>)> {
    providers()
        .into_iter()
        .map(|p| (p.name(), p.create_client(cache_id).expect("create client")))
        .collect()
}

/// In-memory log sink for asserting on formatted events.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
