use std::sync::Arc;

use anyhow::{Context, Result};
use discofetch_core::{
    ArtistDownloader, CatalogProvider, Config, HttpCatalogProvider, JobQueue, JobStore,
    ReleaseResolver, SanitizedConfig, SqliteJobStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    queue: Arc<JobQueue>,
    downloader: ArtistDownloader,
}

impl AppState {
    /// Wire the catalog provider, job store and orchestrator from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn JobStore> = Arc::new(
            SqliteJobStore::new(&config.queue.database_path)
                .context("Failed to create job store")?,
        );
        let provider: Arc<dyn CatalogProvider> = Arc::new(
            HttpCatalogProvider::new(&config.catalog)
                .context("Failed to create catalog provider")?,
        );

        Ok(Self::with_parts(config, store, provider))
    }

    /// Build state around existing collaborators.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn JobStore>,
        provider: Arc<dyn CatalogProvider>,
    ) -> Self {
        let queue = Arc::new(JobQueue::new(store));
        let resolver = ReleaseResolver::new(provider, config.catalog.provider_host.clone());
        let downloader = ArtistDownloader::new(
            config.orchestrator.clone(),
            resolver,
            Arc::clone(&queue),
        );

        Self {
            config,
            queue,
            downloader,
        }
    }

    pub fn queue(&self) -> &JobQueue {
        self.queue.as_ref()
    }

    pub fn downloader(&self) -> &ArtistDownloader {
        &self.downloader
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }
}
