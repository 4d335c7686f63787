//! Job storage trait and types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{Job, JobDescriptor, JobStatus};

/// Error type for job storage operations.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// Job not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job's current status does not allow the requested one.
    #[error("Cannot move job {job_id} from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: String,
        to: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Filter for querying jobs.
#[derive(Debug, Clone)]
pub struct JobFilter {
    /// Filter by state type (see [`JobStatus::state_type`]).
    pub state: Option<String>,
    /// Filter by dedup key.
    pub dedup_key: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl JobFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            state: None,
            dedup_key: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by state type.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Filter by dedup key.
    pub fn with_dedup_key(mut self, dedup_key: impl Into<String>) -> Self {
        self.dedup_key = Some(dedup_key.into());
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for job storage backends.
///
/// Every method must be atomic with respect to every other method on the
/// same store.
pub trait JobStore: Send + Sync {
    /// Record a submission.
    ///
    /// If an active (queued or processing) job already has `dedup_key`, the
    /// new job is stored as [`JobStatus::Duplicate`] of it; otherwise it is
    /// stored as [`JobStatus::Queued`]. The check and the insert must not be
    /// separable by a concurrent `admit`.
    fn admit(&self, descriptor: JobDescriptor, dedup_key: &str) -> Result<Job, JobStoreError>;

    /// Get a job by ID.
    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError>;

    /// List jobs matching the filter, oldest first.
    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError>;

    /// Count jobs matching the filter.
    fn count(&self, filter: &JobFilter) -> Result<i64, JobStoreError>;

    /// Move a job to `new_status` if its current status allows it.
    fn transition(&self, id: &str, new_status: JobStatus) -> Result<Job, JobStoreError>;

    /// Move the oldest queued job to processing and return it.
    fn claim_next(&self) -> Result<Option<Job>, JobStoreError>;

    /// Delete terminal jobs last updated before `before`. Returns the number deleted.
    fn purge_terminal(&self, before: DateTime<Utc>) -> Result<usize, JobStoreError>;
}
