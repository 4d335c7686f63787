//! Release resolution for an artist link.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::link::ArtistLink;
use super::types::Release;
use super::{CatalogError, CatalogProvider, ResolveError, UpstreamFetchError, LISTING_FIELD};

/// Resolves the releases of an artist through a catalog provider.
///
/// Stateless apart from its configuration; cheap to clone.
#[derive(Clone)]
pub struct ReleaseResolver {
    provider: Arc<dyn CatalogProvider>,
    provider_host: String,
}

impl ReleaseResolver {
    /// Create a resolver accepting links from `provider_host`.
    pub fn new(provider: Arc<dyn CatalogProvider>, provider_host: impl Into<String>) -> Self {
        Self {
            provider,
            provider_host: provider_host.into(),
        }
    }

    /// Validate an artist link without contacting the catalog.
    pub fn parse_link(&self, artist_url: &str) -> Result<ArtistLink, super::ValidationError> {
        ArtistLink::parse(artist_url, &self.provider_host)
    }

    /// Validate the link, then fetch and read the artist's releases.
    pub async fn resolve_releases(&self, artist_url: &str) -> Result<Vec<Release>, ResolveError> {
        let link = self.parse_link(artist_url)?;
        Ok(self.fetch_releases(&link).await?)
    }

    /// Fetch the raw discography payload for an artist link.
    pub async fn discography(&self, artist_url: &str) -> Result<Value, ResolveError> {
        let link = self.parse_link(artist_url)?;
        self.fetch_payload(&link)
            .await
            .map_err(|source| ResolveError::UpstreamFetch(UpstreamFetchError::Provider {
                artist_id: link.artist_id.clone(),
                source,
            }))
    }

    /// Fetch the releases of an already validated link.
    ///
    /// A payload without a listing is a failure, not an empty result. Listing
    /// items that are not release objects are skipped.
    pub async fn fetch_releases(
        &self,
        link: &ArtistLink,
    ) -> Result<Vec<Release>, UpstreamFetchError> {
        info!(artist_id = %link.artist_id, "Fetching artist releases");

        let payload = self
            .fetch_payload(link)
            .await
            .map_err(|source| UpstreamFetchError::Provider {
                artist_id: link.artist_id.clone(),
                source,
            })?;

        let Some(items) = payload.get(LISTING_FIELD).and_then(Value::as_array) else {
            return Err(UpstreamFetchError::MissingListing {
                artist_id: link.artist_id.clone(),
            });
        };

        let releases: Vec<Release> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let release = Release::from_item(item);
                if release.is_none() {
                    warn!(
                        artist_id = %link.artist_id,
                        "Skipping unreadable listing item at index {}", idx
                    );
                }
                release
            })
            .collect();

        debug!(
            artist_id = %link.artist_id,
            "Artist listing has {} items, {} readable",
            items.len(),
            releases.len()
        );

        Ok(releases)
    }

    async fn fetch_payload(&self, link: &ArtistLink) -> Result<Value, CatalogError> {
        self.provider.artist_discography(&link.artist_id).await
    }
}
