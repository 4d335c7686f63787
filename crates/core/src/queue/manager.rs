//! Job queue service: admission with deduplication and executor-side transitions.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::dedup::normalize_target_url;
use super::{
    DispatchError, Job, JobDescriptor, JobDispatcher, JobFilter, JobStatus, JobStore,
    JobStoreError,
};
use crate::metrics;

/// Errors returned by [`JobQueue`].
#[derive(Debug, Error)]
pub enum QueueError {
    /// No job with this ID.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job's status does not allow the requested transition.
    #[error("Cannot move job {job_id} from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: String,
        to: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(JobStoreError),

    /// The job was admitted but could not be handed to the execution backend.
    /// It has been moved to `error`.
    #[error("Failed to dispatch job {job_id}: {source}")]
    Dispatch {
        job_id: String,
        #[source]
        source: DispatchError,
    },
}

impl From<JobStoreError> for QueueError {
    fn from(err: JobStoreError) -> Self {
        match err {
            JobStoreError::NotFound(id) => QueueError::NotFound(id),
            JobStoreError::InvalidTransition { job_id, from, to } => {
                QueueError::InvalidTransition { job_id, from, to }
            }
            other => QueueError::Store(other),
        }
    }
}

/// The work queue.
///
/// Share one instance (behind `Arc`) between every producer; duplicate
/// detection only covers jobs submitted through the same store.
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    dispatcher: Option<Arc<dyn JobDispatcher>>,
}

impl JobQueue {
    /// Create a queue without a dispatcher; workers pull with [`JobQueue::claim_next`].
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            dispatcher: None,
        }
    }

    /// Push every queued job to `dispatcher` on admission.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn JobDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Submit a job.
    ///
    /// Returns the recorded job. A submission whose target is already held by
    /// a queued or processing job is recorded with [`JobStatus::Duplicate`]
    /// and returned as `Ok`.
    pub async fn submit(&self, descriptor: JobDescriptor) -> Result<Job, QueueError> {
        let dedup_key = normalize_target_url(&descriptor.target_url);

        let job = self.store.admit(descriptor, &dedup_key).map_err(|e| {
            metrics::JOB_SUBMISSIONS.with_label_values(&["failed"]).inc();
            QueueError::from(e)
        })?;

        if let Some(existing_job_id) = job.status.existing_job_id() {
            warn!(
                job_id = %job.id,
                existing_job_id = %existing_job_id,
                "Duplicate submission for {}", job.target_url
            );
            metrics::JOB_SUBMISSIONS.with_label_values(&["duplicate"]).inc();
            return Ok(job);
        }

        if let Some(dispatcher) = &self.dispatcher {
            if let Err(source) = dispatcher.dispatch(&job).await {
                error!(job_id = %job.id, error = %source, "Failed to dispatch job");
                metrics::JOB_SUBMISSIONS.with_label_values(&["failed"]).inc();

                let message = format!("dispatch failed: {}", source);
                if let Err(e) = self.store.transition(&job.id, JobStatus::Error { message }) {
                    error!(job_id = %job.id, error = %e, "Failed to release undispatched job");
                }

                return Err(QueueError::Dispatch {
                    job_id: job.id,
                    source,
                });
            }
        }

        metrics::JOB_SUBMISSIONS.with_label_values(&["queued"]).inc();
        info!(job_id = %job.id, "Queued {} ({})", job.display_name, job.target_url);

        Ok(job)
    }

    /// Current record of a job.
    pub fn status_of(&self, job_id: &str) -> Result<Job, QueueError> {
        self.store
            .get(job_id)?
            .ok_or_else(|| QueueError::NotFound(job_id.to_string()))
    }

    /// Queued -> Processing.
    pub fn start_processing(&self, job_id: &str) -> Result<Job, QueueError> {
        self.transition(job_id, JobStatus::Processing)
    }

    /// Processing -> Complete.
    pub fn complete(&self, job_id: &str) -> Result<Job, QueueError> {
        self.transition(job_id, JobStatus::Complete)
    }

    /// Queued or Processing -> Error.
    pub fn fail(&self, job_id: &str, message: impl Into<String>) -> Result<Job, QueueError> {
        self.transition(
            job_id,
            JobStatus::Error {
                message: message.into(),
            },
        )
    }

    /// Claim the oldest queued job for a pull-based worker.
    pub fn claim_next(&self) -> Result<Option<Job>, QueueError> {
        let job = self.store.claim_next()?;
        if let Some(ref job) = job {
            metrics::JOB_TRANSITIONS
                .with_label_values(&[job.status.state_type()])
                .inc();
            debug!(job_id = %job.id, "Claimed job");
        }
        Ok(job)
    }

    /// List jobs matching the filter.
    pub fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, QueueError> {
        Ok(self.store.list(filter)?)
    }

    /// Count jobs matching the filter.
    pub fn count(&self, filter: &JobFilter) -> Result<i64, QueueError> {
        Ok(self.store.count(filter)?)
    }

    /// Delete terminal jobs not updated within `older_than`.
    pub fn purge_terminal(&self, older_than: chrono::Duration) -> Result<usize, QueueError> {
        let purged = self.store.purge_terminal(Utc::now() - older_than)?;
        if purged > 0 {
            info!("Purged {} terminal jobs", purged);
        }
        Ok(purged)
    }

    fn transition(&self, job_id: &str, status: JobStatus) -> Result<Job, QueueError> {
        let job = self.store.transition(job_id, status)?;
        metrics::JOB_TRANSITIONS
            .with_label_values(&[job.status.state_type()])
            .inc();
        debug!(job_id = %job.id, "Job is now {}", job.status.state_type());
        Ok(job)
    }
}
