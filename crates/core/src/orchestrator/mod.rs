//! Artist download orchestrator.
//!
//! Turns one artist link into many album jobs:
//! - **Resolve**: fetch the artist's releases from the catalog
//! - **Classify**: keep releases matching the requested categories
//! - **Submit**: queue one job per release, concurrently (bounded)
//! - **Report**: split the recorded jobs into queued and duplicates

mod config;
mod runner;
mod types;

pub use config::{OrchestratorConfig, RELEASE_ID_PLACEHOLDER};
pub use runner::{ArtistDownloader, ARTIST_REQUEST_TYPE};
pub use types::{ArtistDownloadOutcome, DuplicateRelease, OrchestratorError, QueuedRelease};
