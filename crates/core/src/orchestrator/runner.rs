//! Artist download orchestration.
//!
//! One run resolves an artist's releases, keeps those the caller asked for
//! and submits one album job per release:
//! - Resolution: a single catalog call
//! - Submission: concurrent, bounded by `submit_concurrency`
//! - Partition: each recorded job is reported as queued or duplicate

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::catalog::{Release, ReleaseResolver};
use crate::metrics;
use crate::queue::{Job, JobDescriptor, JobQueue, OriginContext};
use crate::taxonomy::{matched_category, RequestedCategorySet};

use super::config::OrchestratorConfig;
use super::types::{ArtistDownloadOutcome, DuplicateRelease, OrchestratorError, QueuedRelease};

/// Request type recorded as `parent_request_type` in job provenance.
pub const ARTIST_REQUEST_TYPE: &str = "artist";

/// Message reported for a duplicate whose job carries none.
const DEFAULT_DUPLICATE_MESSAGE: &str = "Duplicate download attempt.";

/// A release that survived classification, with the fields a job needs.
#[derive(Debug, Clone)]
struct AdmittedRelease {
    id: String,
    name: String,
    artist: String,
    url: String,
}

/// Fans an artist link out into album jobs.
///
/// Holds no per-run state; one instance serves concurrent runs.
pub struct ArtistDownloader {
    config: OrchestratorConfig,
    resolver: ReleaseResolver,
    queue: Arc<JobQueue>,
}

impl ArtistDownloader {
    /// Create a new downloader.
    pub fn new(
        config: OrchestratorConfig,
        resolver: ReleaseResolver,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            config,
            resolver,
            queue,
        }
    }

    /// The queue jobs are submitted to.
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    /// Queue one album job per release of the artist matching `requested_categories`.
    ///
    /// `requested_categories` is a comma-separated category list; `None` uses
    /// the configured default. `base_origin` entries are copied into every
    /// job's provenance unless they collide with the entries set here.
    ///
    /// Only link validation and release resolution abort the run. Releases
    /// that cannot be submitted are logged and left out of both lists.
    pub async fn download_artist_releases(
        &self,
        artist_url: &str,
        requested_categories: Option<&str>,
        base_origin: &OriginContext,
    ) -> Result<ArtistDownloadOutcome, OrchestratorError> {
        let started = Instant::now();
        let result = self
            .run(artist_url, requested_categories, base_origin)
            .await;

        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.result_label(),
        };
        metrics::ORCHESTRATION_RUNS.with_label_values(&[label]).inc();
        metrics::ORCHESTRATION_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        artist_url: &str,
        requested_categories: Option<&str>,
        base_origin: &OriginContext,
    ) -> Result<ArtistDownloadOutcome, OrchestratorError> {
        let link = self.resolver.parse_link(artist_url)?;

        let categories = RequestedCategorySet::parse(
            requested_categories.unwrap_or(&self.config.default_categories),
        );
        info!(
            artist_id = %link.artist_id,
            "Downloading artist releases of types: {}", categories
        );

        let releases = self.resolver.fetch_releases(&link).await?;
        let admitted = self.admit_releases(releases, &categories);

        if admitted.is_empty() {
            warn!(
                artist_id = %link.artist_id,
                "No releases match the requested types: {}", categories
            );
            return Ok(ArtistDownloadOutcome::default());
        }

        let submissions: Vec<(AdmittedRelease, Option<Job>)> = stream::iter(admitted)
            .map(|release| {
                let descriptor = self.descriptor_for(&release, &link.url, base_origin);
                async move {
                    match self.queue.submit(descriptor).await {
                        Ok(job) => (release, Some(job)),
                        Err(e) => {
                            error!(
                                "Failed to queue {} ({}): {}",
                                release.name, release.url, e
                            );
                            (release, None)
                        }
                    }
                }
            })
            .buffered(self.config.submit_concurrency.max(1))
            .collect()
            .await;

        let outcome = partition(submissions);

        info!(
            artist_id = %link.artist_id,
            "Artist release processing: {} queued, {} duplicates",
            outcome.queued.len(),
            outcome.duplicates.len()
        );

        Ok(outcome)
    }

    /// Keep releases the categories admit and that carry an ID and URL.
    fn admit_releases(
        &self,
        releases: Vec<Release>,
        categories: &RequestedCategorySet,
    ) -> Vec<AdmittedRelease> {
        releases
            .into_iter()
            .filter_map(|release| {
                let Some(category) =
                    matched_category(release.declared_type, release.declared_group, categories)
                else {
                    metrics::RELEASES_PROCESSED
                        .with_label_values(&["filtered"])
                        .inc();
                    return None;
                };

                let (Some(id), Some(url)) = (release.id, release.canonical_url) else {
                    warn!("Skipping release without URL or ID: {}", release.name);
                    metrics::RELEASES_PROCESSED.with_label_values(&["skipped"]).inc();
                    return None;
                };

                debug!("Release {} ({}) admitted as {}", release.name, id, category);
                metrics::RELEASES_PROCESSED
                    .with_label_values(&["admitted"])
                    .inc();

                Some(AdmittedRelease {
                    id,
                    name: release.name,
                    artist: release.primary_artist_name,
                    url,
                })
            })
            .collect()
    }

    fn descriptor_for(
        &self,
        release: &AdmittedRelease,
        artist_url: &str,
        base_origin: &OriginContext,
    ) -> JobDescriptor {
        let mut origin = OriginContext::new()
            .with("url", release.url.as_str())
            .with("name", release.name.as_str())
            .with("artist", release.artist.as_str())
            .with("type", crate::queue::ALBUM_RESOURCE_TYPE)
            .with("parent_artist_url", artist_url)
            .with("parent_request_type", ARTIST_REQUEST_TYPE);

        if let Some(original_url) = self.config.callback_url(&release.id) {
            origin.insert("original_url", original_url);
        }
        origin.extend_missing(base_origin);

        JobDescriptor::album(&release.url, &release.name, &release.artist).with_origin(origin)
    }
}

/// Sort recorded jobs into queued and duplicate releases, keeping order.
fn partition(submissions: Vec<(AdmittedRelease, Option<Job>)>) -> ArtistDownloadOutcome {
    let mut outcome = ArtistDownloadOutcome::default();

    for (release, job) in submissions {
        let Some(job) = job else {
            continue;
        };

        let view = job.status_view();
        let is_duplicate = view.is_duplicate();
        match view.existing_job_id {
            Some(existing_job_id) if is_duplicate => {
                warn!(
                    "Release {} ({}) is a duplicate. Job {}, existing job {}",
                    release.name, release.url, job.id, existing_job_id
                );
                outcome.duplicates.push(DuplicateRelease {
                    name: release.name,
                    artist: release.artist,
                    url: release.url,
                    job_id: job.id,
                    existing_job_id,
                    message: view
                        .message
                        .unwrap_or_else(|| DEFAULT_DUPLICATE_MESSAGE.to_string()),
                });
            }
            _ => {
                outcome.queued.push(QueuedRelease {
                    name: release.name,
                    artist: release.artist,
                    url: release.url,
                    job_id: job.id,
                });
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogProvider, ValidationError, DEFAULT_PROVIDER_HOST};
    use crate::queue::{JobStatus, SqliteJobStore};
    use crate::testing::{fixtures, MockCatalog};
    use serde_json::json;

    const ARTIST_ID: &str = "0TnOYISbd1XYRBk9myaseg";

    struct Harness {
        catalog: Arc<MockCatalog>,
        downloader: ArtistDownloader,
    }

    fn harness(config: OrchestratorConfig) -> Harness {
        let catalog = Arc::new(MockCatalog::new());
        let resolver = ReleaseResolver::new(
            Arc::clone(&catalog) as Arc<dyn CatalogProvider>,
            DEFAULT_PROVIDER_HOST,
        );
        let queue = Arc::new(JobQueue::new(Arc::new(SqliteJobStore::in_memory().unwrap())));
        Harness {
            catalog,
            downloader: ArtistDownloader::new(config, resolver, queue),
        }
    }

    #[tokio::test]
    async fn test_filters_and_queues_in_release_order() {
        let h = harness(OrchestratorConfig::default());
        h.catalog
            .set_releases(
                ARTIST_ID,
                vec![
                    fixtures::release_item("a1", "Album One", "album", "album"),
                    fixtures::release_item("s1", "Single One", "single", "single"),
                    fixtures::release_item("x1", "Guest Spot", "album", "appears_on"),
                    fixtures::release_item("a2", "Album Two", "album", "album"),
                ],
            )
            .await;

        let outcome = h
            .downloader
            .download_artist_releases(
                &fixtures::artist_url(ARTIST_ID),
                Some("album"),
                &OriginContext::new(),
            )
            .await
            .unwrap();

        let names: Vec<&str> = outcome.queued.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["Album One", "Album Two"]);
        assert!(outcome.duplicates.is_empty());
    }

    #[tokio::test]
    async fn test_default_categories_used_when_unspecified() {
        let h = harness(OrchestratorConfig::default());
        h.catalog
            .set_releases(
                ARTIST_ID,
                vec![
                    fixtures::release_item("a1", "Album", "album", "album"),
                    fixtures::release_item("s1", "Single", "single", "single"),
                    fixtures::release_item("c1", "Hits", "compilation", "album"),
                    fixtures::release_item("x1", "Guest", "album", "appears_on"),
                ],
            )
            .await;

        let outcome = h
            .downloader
            .download_artist_releases(&fixtures::artist_url(ARTIST_ID), None, &OriginContext::new())
            .await
            .unwrap();

        assert_eq!(outcome.queued.len(), 3);
    }

    #[tokio::test]
    async fn test_origin_context_fields() {
        let h = harness(OrchestratorConfig {
            callback_url_template: Some("http://localhost:7171/album/{release_id}".to_string()),
            ..Default::default()
        });
        h.catalog
            .set_releases(
                ARTIST_ID,
                vec![fixtures::release_item("a1", "Album One", "album", "album")],
            )
            .await;
        let artist_url = fixtures::artist_url(ARTIST_ID);
        let base = OriginContext::new()
            .with("type", "artist")
            .with("client", "cli");

        let outcome = h
            .downloader
            .download_artist_releases(&artist_url, Some("album"), &base)
            .await
            .unwrap();

        let job = h.downloader.queue().status_of(&outcome.queued[0].job_id).unwrap();
        assert_eq!(job.retry_url, fixtures::album_url("a1"));
        assert_eq!(job.resource_type, "album");
        assert_eq!(job.origin.get("url"), Some(&json!(fixtures::album_url("a1"))));
        assert_eq!(job.origin.get("type"), Some(&json!("album")));
        assert_eq!(job.origin.get("parent_artist_url"), Some(&json!(artist_url)));
        assert_eq!(job.origin.get("parent_request_type"), Some(&json!("artist")));
        assert_eq!(
            job.origin.get("original_url"),
            Some(&json!("http://localhost:7171/album/a1"))
        );
        assert_eq!(job.origin.get("client"), Some(&json!("cli")));
    }

    #[tokio::test]
    async fn test_second_run_reports_duplicates() {
        let h = harness(OrchestratorConfig::default());
        h.catalog
            .set_releases(
                ARTIST_ID,
                vec![fixtures::release_item("a1", "Album One", "album", "album")],
            )
            .await;
        let url = fixtures::artist_url(ARTIST_ID);

        let first = h
            .downloader
            .download_artist_releases(&url, Some("album"), &OriginContext::new())
            .await
            .unwrap();
        let second = h
            .downloader
            .download_artist_releases(&url, Some("album"), &OriginContext::new())
            .await
            .unwrap();

        assert!(second.queued.is_empty());
        assert_eq!(second.duplicates.len(), 1);
        assert_eq!(second.duplicates[0].existing_job_id, first.queued[0].job_id);
        assert_ne!(second.duplicates[0].job_id, first.queued[0].job_id);
        assert!(!second.duplicates[0].message.is_empty());
    }

    #[tokio::test]
    async fn test_releases_without_id_or_url_are_skipped() {
        let h = harness(OrchestratorConfig::default());
        let mut no_url = fixtures::release_item("a2", "No Url", "album", "album");
        no_url["external_urls"] = json!({});
        h.catalog
            .set_releases(
                ARTIST_ID,
                vec![
                    json!({ "name": "No Id", "album_type": "album", "album_group": "album",
                            "external_urls": { "spotify": "https://open.spotify.com/album/zz" } }),
                    no_url,
                    fixtures::release_item("a1", "Good", "album", "album"),
                ],
            )
            .await;

        let outcome = h
            .downloader
            .download_artist_releases(
                &fixtures::artist_url(ARTIST_ID),
                Some("album"),
                &OriginContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.queued.len(), 1);
        assert_eq!(outcome.queued[0].name, "Good");
    }

    #[tokio::test]
    async fn test_empty_category_set_submits_nothing() {
        let h = harness(OrchestratorConfig::default());
        h.catalog
            .set_releases(
                ARTIST_ID,
                vec![fixtures::release_item("a1", "Album", "album", "album")],
            )
            .await;

        let outcome = h
            .downloader
            .download_artist_releases(
                &fixtures::artist_url(ARTIST_ID),
                Some("bogus, ,"),
                &OriginContext::new(),
            )
            .await
            .unwrap();

        assert!(outcome.is_empty());
        assert_eq!(h.downloader.queue().count(&Default::default()).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validation_error_skips_catalog() {
        let h = harness(OrchestratorConfig::default());

        let err = h
            .downloader
            .download_artist_releases("", Some("album"), &OriginContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Validation(ValidationError::EmptyUrl)));
        assert_eq!(h.catalog.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_submissions_dropped_from_both_lists() {
        let h = harness(OrchestratorConfig::default());
        h.catalog
            .set_releases(
                ARTIST_ID,
                vec![fixtures::release_item("a1", "Album", "album", "album")],
            )
            .await;

        let (dispatcher, rx) = crate::queue::ChannelDispatcher::channel(1);
        drop(rx);
        let queue = Arc::new(
            JobQueue::new(Arc::new(SqliteJobStore::in_memory().unwrap()))
                .with_dispatcher(Arc::new(dispatcher)),
        );
        let downloader = ArtistDownloader::new(
            OrchestratorConfig::default(),
            ReleaseResolver::new(h.catalog.clone(), DEFAULT_PROVIDER_HOST),
            Arc::clone(&queue),
        );

        let outcome = downloader
            .download_artist_releases(
                &fixtures::artist_url(ARTIST_ID),
                Some("album"),
                &OriginContext::new(),
            )
            .await
            .unwrap();

        assert!(outcome.is_empty());
        let jobs = queue.list(&Default::default()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(matches!(jobs[0].status, JobStatus::Error { .. }));
    }
}
