//! Artist link validation.
//!
//! Only one catalog site is supported. Links from any other host are
//! rejected before the catalog is contacted.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;
use url::Url;

/// Host of the catalog site artist links are accepted from.
pub const DEFAULT_PROVIDER_HOST: &str = "open.spotify.com";

static ARTIST_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

/// Malformed or unsupported caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No artist URL given.
    #[error("missing required parameter: url")]
    EmptyUrl,

    /// The artist identifier could not be read from the URL.
    #[error("failed to extract artist ID from URL: {0}")]
    MissingArtistId(String),

    /// The URL does not point at the supported catalog site.
    #[error("invalid URL: artist downloads only support {expected_host} URLs (got {url})")]
    UnsupportedProvider { url: String, expected_host: String },
}

/// A validated artist link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistLink {
    /// The link as supplied by the caller, trimmed.
    pub url: String,
    /// Catalog artist ID.
    pub artist_id: String,
}

impl ArtistLink {
    /// Validate `url` against `provider_host` and extract the artist ID.
    ///
    /// Checks run in order: empty input, ID extraction, host.
    pub fn parse(url: &str, provider_host: &str) -> Result<Self, ValidationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let artist_id = extract_artist_id(url)
            .ok_or_else(|| ValidationError::MissingArtistId(url.to_string()))?;

        if !is_provider_url(url, provider_host) {
            return Err(ValidationError::UnsupportedProvider {
                url: url.to_string(),
                expected_host: provider_host.to_string(),
            });
        }

        Ok(Self {
            url: url.to_string(),
            artist_id,
        })
    }
}

/// Last path segment, without query string or fragment.
fn extract_artist_id(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let candidate = without_query.rsplit('/').next().unwrap_or_default();

    if ARTIST_ID.is_match(candidate) {
        Some(candidate.to_string())
    } else {
        None
    }
}

fn is_provider_url(url: &str, provider_host: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    // `/artist/{id}`, optionally behind a locale prefix such as `/intl-de`.
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let is_artist_path = segments.len() >= 2 && segments[segments.len() - 2] == "artist";

    parsed
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(provider_host))
        && is_artist_path
}
