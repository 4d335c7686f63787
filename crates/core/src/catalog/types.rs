//! Types for catalog discography responses.

use serde::{Deserialize, Serialize};

/// Name used when the catalog omits a release title.
pub const UNKNOWN_RELEASE_NAME: &str = "Unknown Album";

/// Name used when the catalog omits the release artists.
pub const UNKNOWN_ARTIST_NAME: &str = "Unknown Artist";

/// Intrinsic kind of a release, as declared by the catalog (`album_type`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseType {
    Album,
    Single,
    Compilation,
    #[default]
    #[serde(other)]
    Other,
}

impl ReleaseType {
    /// Case-insensitive parse; unrecognized values map to `Other`.
    pub fn from_declared(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "album" => ReleaseType::Album,
            "single" => ReleaseType::Single,
            "compilation" => ReleaseType::Compilation,
            _ => ReleaseType::Other,
        }
    }
}

/// How a release relates to the artist, as declared by the catalog (`album_group`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseGroup {
    Album,
    Single,
    AppearsOn,
    #[default]
    #[serde(other)]
    Other,
}

impl ReleaseGroup {
    /// Case-insensitive parse; unrecognized values map to `Other`.
    pub fn from_declared(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "album" => ReleaseGroup::Album,
            "single" => ReleaseGroup::Single,
            "appears_on" => ReleaseGroup::AppearsOn,
            _ => ReleaseGroup::Other,
        }
    }
}

/// One release of an artist, read from a discography listing.
///
/// `id` and `canonical_url` stay optional: listings occasionally carry items
/// without them and those items are skipped downstream rather than failing
/// the whole listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Release {
    /// Catalog release ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Release title.
    pub name: String,
    /// Declared release type.
    pub declared_type: ReleaseType,
    /// Declared release group.
    pub declared_group: ReleaseGroup,
    /// Public URL of the release on the catalog site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    /// First credited artist.
    pub primary_artist_name: String,
}

impl Release {
    /// Read a release from one item of a discography listing.
    ///
    /// Returns `None` if the item is not an object of the expected shape.
    pub fn from_item(item: &serde_json::Value) -> Option<Self> {
        let raw: RawRelease = serde_json::from_value(item.clone()).ok()?;
        Some(raw.into())
    }
}

// ============================================================================
// Listing item shape (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRelease {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    album_type: Option<String>,
    #[serde(default)]
    album_group: Option<String>,
    #[serde(default)]
    external_urls: Option<RawExternalUrls>,
    #[serde(default)]
    artists: Vec<RawArtist>,
}

#[derive(Debug, Deserialize)]
struct RawExternalUrls {
    #[serde(default)]
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    #[serde(default)]
    name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<RawRelease> for Release {
    fn from(raw: RawRelease) -> Self {
        let primary_artist_name = raw
            .artists
            .into_iter()
            .next()
            .and_then(|a| non_empty(a.name))
            .unwrap_or_else(|| UNKNOWN_ARTIST_NAME.to_string());

        Release {
            id: non_empty(raw.id),
            name: non_empty(raw.name).unwrap_or_else(|| UNKNOWN_RELEASE_NAME.to_string()),
            declared_type: raw
                .album_type
                .as_deref()
                .map(ReleaseType::from_declared)
                .unwrap_or_default(),
            declared_group: raw
                .album_group
                .as_deref()
                .map(ReleaseGroup::from_declared)
                .unwrap_or_default(),
            canonical_url: non_empty(raw.external_urls.and_then(|u| u.spotify)),
            primary_artist_name,
        }
    }
}
