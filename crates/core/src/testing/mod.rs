//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external seams (catalog
//! provider, execution backend), allowing end-to-end tests of the artist
//! download flow without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use discofetch_core::testing::{fixtures, MockCatalog, RecordingDispatcher};
//!
//! let catalog = MockCatalog::new();
//! let dispatcher = RecordingDispatcher::new();
//!
//! catalog
//!     .set_releases("artist1", vec![fixtures::release_item("a1", "Debut", "album", "album")])
//!     .await;
//! ```

mod mock_catalog;
mod mock_dispatcher;

pub use mock_catalog::MockCatalog;
pub use mock_dispatcher::RecordingDispatcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::queue::JobDescriptor;

    /// Base URL of album links in fixtures.
    pub const ALBUM_URL_BASE: &str = "https://open.spotify.com/album";

    /// Canonical album link for a release ID.
    pub fn album_url(id: &str) -> String {
        format!("{}/{}", ALBUM_URL_BASE, id)
    }

    /// Artist link for an artist ID.
    pub fn artist_url(artist_id: &str) -> String {
        format!("https://open.spotify.com/artist/{}", artist_id)
    }

    /// A listing item in the provider's payload shape.
    pub fn release_item(id: &str, name: &str, album_type: &str, album_group: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "album_type": album_type,
            "album_group": album_group,
            "external_urls": { "spotify": album_url(id) },
            "artists": [{ "name": "Test Artist" }],
        })
    }

    /// An album job descriptor for `id` with empty provenance.
    pub fn descriptor(id: &str) -> JobDescriptor {
        JobDescriptor::album(album_url(id), format!("Album {}", id), "Test Artist")
    }
}
