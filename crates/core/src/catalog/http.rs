//! JSON-over-HTTP transport to a discography metadata service.
//!
//! The service speaks the Spotify Web API shape: `GET /artists/{id}/albums`
//! returns a page with an `items` array and a `next` link to the following
//! page. Pages are fetched until `next` is null or `max_pages` is reached and
//! their items merged into one listing. A `next` link pointing away from the
//! configured service is not followed, so the token never leaves it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::link::DEFAULT_PROVIDER_HOST;
use super::{CatalogError, CatalogProvider, LISTING_FIELD};
use crate::metrics;

/// Release groups requested from the service; filtering happens locally.
const ALL_GROUPS: &str = "album,single,compilation,appears_on";

/// Page size requested from the service (its maximum).
const PAGE_LIMIT: u32 = 50;

/// Catalog transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the metadata service (default: https://api.spotify.com/v1).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Host artist links must point at.
    #[serde(default = "default_provider_host")]
    pub provider_host: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum number of listing pages fetched per artist.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Bearer token sent with every request, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// User-Agent header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_provider_host() -> String {
    DEFAULT_PROVIDER_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> u32 {
    20
}

fn default_user_agent() -> String {
    format!("discofetch/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            provider_host: default_provider_host(),
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
            api_token: None,
            user_agent: default_user_agent(),
        }
    }
}

/// HTTP catalog provider.
pub struct HttpCatalogProvider {
    client: Client,
    base_url: String,
    origin: url::Origin,
    api_token: Option<String>,
    max_pages: u32,
}

impl HttpCatalogProvider {
    /// Create a new provider.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            CatalogError::NotConfigured(format!("invalid base_url {:?}: {}", config.base_url, e))
        })?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            origin: base.origin(),
            api_token: config.api_token.clone(),
            max_pages: config.max_pages.max(1),
        })
    }

    fn listing_url(&self, artist_id: &str) -> String {
        format!(
            "{}/artists/{}/albums",
            self.base_url,
            urlencoding::encode(artist_id)
        )
    }

    /// Whether `link` is served by the configured service.
    fn is_same_service(&self, link: &str) -> bool {
        Url::parse(link)
            .map(|url| url.origin() == self.origin)
            .unwrap_or(false)
    }

    async fn get_page(
        &self,
        request: reqwest::RequestBuilder,
        artist_id: &str,
    ) -> Result<Value, CatalogError> {
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let started = Instant::now();
        let result = self.send(request, artist_id).await;
        metrics::CATALOG_REQUEST_DURATION.observe(started.elapsed().as_secs_f64());
        metrics::CATALOG_REQUESTS
            .with_label_values(&[if result.is_ok() { "success" } else { "error" }])
            .inc();
        result
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        artist_id: &str,
    ) -> Result<Value, CatalogError> {
        let response = request.send().await?;

        let status = response.status();
        if status == 429 {
            warn!("Catalog rate limit exceeded");
            return Err(CatalogError::RateLimitExceeded);
        }
        if status == 404 {
            return Err(CatalogError::NotFound(artist_id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse discography response: {}", e))
        })
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalogProvider {
    async fn artist_discography(&self, artist_id: &str) -> Result<Value, CatalogError> {
        debug!("Fetching discography: artist_id={}", artist_id);

        let first = self
            .client
            .get(self.listing_url(artist_id))
            .query(&[
                ("include_groups", ALL_GROUPS),
                ("limit", &PAGE_LIMIT.to_string()),
            ]);
        let mut payload = self.get_page(first, artist_id).await?;

        let mut pages = 1;
        let mut next = next_link(&payload);
        while let Some(url) = next {
            if pages >= self.max_pages {
                warn!(
                    "Discography for {} truncated after {} pages",
                    artist_id, pages
                );
                break;
            }
            if !self.is_same_service(&url) {
                warn!(
                    "Discography for {} truncated: not following next link {}",
                    artist_id, url
                );
                break;
            }

            let page = self.get_page(self.client.get(&url), artist_id).await?;
            next = next_link(&page);
            pages += 1;

            merge_items(&mut payload, page);
        }

        Ok(payload)
    }
}

fn next_link(page: &Value) -> Option<String> {
    page.get("next").and_then(Value::as_str).map(str::to_string)
}

/// Append the listing of `page` to the listing of `payload`.
fn merge_items(payload: &mut Value, page: Value) {
    let Some(Value::Array(extra)) = page.get(LISTING_FIELD).cloned() else {
        return;
    };
    if let Some(Value::Array(items)) = payload.get_mut(LISTING_FIELD) {
        items.extend(extra);
    }
}
