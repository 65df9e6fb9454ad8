use crate::catalog::CatalogBuilder;
use crate::config::{Config, StoreConfig};
use crate::error::Result;
use crate::proxy::{DownloadProxy, UpstreamClient};
use crate::store::{HttpKvStore, MemoryStore, RegistryStore};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts registry entries the catalog builder had to leave out.
#[derive(Debug, Default)]
pub struct CatalogStats {
    skipped_total: AtomicU64,
    last_build_skipped: AtomicU64,
    builds: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStatsSnapshot {
    pub builds: u64,
    pub skipped_entries_total: u64,
    pub last_build_skipped: u64,
}

impl CatalogStats {
    pub fn record_build(&self, skipped: usize) {
        let skipped = skipped as u64;
        self.builds.fetch_add(1, Ordering::Relaxed);
        self.skipped_total.fetch_add(skipped, Ordering::Relaxed);
        self.last_build_skipped.store(skipped, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CatalogStatsSnapshot {
        CatalogStatsSnapshot {
            builds: self.builds.load(Ordering::Relaxed),
            skipped_entries_total: self.skipped_total.load(Ordering::Relaxed),
            last_build_skipped: self.last_build_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Shared by every request handler. Holds no mutable state besides counters.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogBuilder,
    pub proxy: DownloadProxy,
    pub stats: Arc<CatalogStats>,
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn RegistryStore>,
        upstream: Arc<UpstreamClient>,
    ) -> Self {
        Self {
            catalog: CatalogBuilder::new(store.clone()),
            proxy: DownloadProxy::new(store, upstream, Arc::new(config.upstream.clone())),
            stats: Arc::new(CatalogStats::default()),
            public_base_url: config.server.public_base_url.clone(),
        }
    }

    /// Build the upstream client and the configured registry backend.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);

        let store: Arc<dyn RegistryStore> = match &config.store {
            StoreConfig::File { path } => Arc::new(MemoryStore::from_json_file(path).await?),
            StoreConfig::Http { base_url, token } => {
                tracing::info!(base_url = %base_url, "Using HTTP registry backend");
                Arc::new(HttpKvStore::new(
                    upstream.client().clone(),
                    base_url.clone(),
                    token.clone(),
                ))
            }
        };

        Ok(Self::new(config, store, upstream))
    }
}
