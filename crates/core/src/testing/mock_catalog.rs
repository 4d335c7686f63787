//! Mock catalog provider for testing.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{CatalogError, CatalogProvider, LISTING_FIELD};

/// Mock implementation of the CatalogProvider trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable discography payloads per artist
/// - Track requested artist IDs for assertions
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// use discofetch_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::new();
/// catalog
///     .set_releases("artist1", vec![fixtures::release_item("a1", "Debut", "album", "album")])
///     .await;
/// ```
#[derive(Debug)]
pub struct MockCatalog {
    /// Discography payloads by artist ID.
    payloads: Arc<RwLock<HashMap<String, Value>>>,
    /// Requested artist IDs, in order.
    requests: Arc<RwLock<Vec<String>>>,
    /// If set, the next request will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create a new empty mock catalog.
    pub fn new() -> Self {
        Self {
            payloads: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Serve `items` as the artist's release listing.
    pub async fn set_releases(&self, artist_id: &str, items: Vec<Value>) {
        self.set_payload(artist_id, json!({ LISTING_FIELD: items })).await;
    }

    /// Serve an arbitrary payload for the artist.
    pub async fn set_payload(&self, artist_id: &str, payload: Value) {
        self.payloads
            .write()
            .await
            .insert(artist_id.to_string(), payload);
    }

    /// Make the next request fail.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Artist IDs requested so far.
    pub async fn recorded_requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    /// Number of requests made.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl CatalogProvider for MockCatalog {
    async fn artist_discography(&self, artist_id: &str) -> Result<Value, CatalogError> {
        self.requests.write().await.push(artist_id.to_string());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        self.payloads
            .read()
            .await
            .get(artist_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(artist_id.to_string()))
    }
}
