//! Catalog integration: artist links, discography listings, release resolution.
//!
//! The catalog itself is an external service reached through the
//! [`CatalogProvider`] trait. This module validates artist links, reads the
//! provider's listing payload into [`Release`] values and reports failures
//! in the taxonomy callers rely on.

mod http;
mod link;
mod resolver;
mod types;

pub use http::{CatalogConfig, HttpCatalogProvider};
pub use link::{ArtistLink, ValidationError, DEFAULT_PROVIDER_HOST};
pub use resolver::ReleaseResolver;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Top-level field of a discography payload holding the release listing.
pub const LISTING_FIELD: &str = "items";

/// Errors that can occur when talking to the catalog provider.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Provider not configured (missing endpoint, etc.).
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// The catalog call failed or returned an unusable payload.
#[derive(Debug, Error)]
pub enum UpstreamFetchError {
    /// The provider call itself failed.
    #[error("failed to fetch discography for artist {artist_id}: {source}")]
    Provider {
        artist_id: String,
        #[source]
        source: CatalogError,
    },

    /// The payload has no release listing.
    #[error("failed to retrieve artist data or no albums found for artist ID {artist_id}")]
    MissingListing { artist_id: String },
}

/// Errors from [`ReleaseResolver`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    UpstreamFetch(#[from] UpstreamFetchError),
}

/// Source of artist discography listings.
///
/// Implementations return the provider payload untouched; it must carry a
/// top-level [`LISTING_FIELD`] array of release objects. No retries are
/// expected at this layer.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch the discography payload for a catalog artist ID.
    async fn artist_discography(&self, artist_id: &str) -> Result<serde_json::Value, CatalogError>;
}
