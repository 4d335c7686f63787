//! Types for the artist download orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{ResolveError, UpstreamFetchError, ValidationError};

/// Errors that abort an artist download run.
///
/// Per-release problems never surface here; they are logged and the release
/// is left out of the outcome.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The artist link was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The artist's releases could not be fetched.
    #[error(transparent)]
    UpstreamFetch(#[from] UpstreamFetchError),
}

impl From<ResolveError> for OrchestratorError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Validation(e) => OrchestratorError::Validation(e),
            ResolveError::UpstreamFetch(e) => OrchestratorError::UpstreamFetch(e),
        }
    }
}

impl OrchestratorError {
    /// Metric label for this failure.
    pub fn result_label(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "validation_error",
            OrchestratorError::UpstreamFetch(_) => "upstream_error",
        }
    }
}

/// A release that was admitted to the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedRelease {
    pub name: String,
    pub artist: String,
    pub url: String,
    pub job_id: String,
}

/// A release rejected because another active job already holds its URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateRelease {
    pub name: String,
    pub artist: String,
    pub url: String,
    /// ID of the job recorded for this (rejected) submission.
    pub job_id: String,
    /// ID of the active job that holds the URL.
    pub existing_job_id: String,
    pub message: String,
}

/// Result of one artist download run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtistDownloadOutcome {
    pub queued: Vec<QueuedRelease>,
    pub duplicates: Vec<DuplicateRelease>,
}

impl ArtistDownloadOutcome {
    /// Returns true if nothing was queued and nothing was a duplicate.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty() && self.duplicates.is_empty()
    }
}
