//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource type of jobs created for artist releases.
pub const ALBUM_RESOURCE_TYPE: &str = "album";

// ============================================================================
// Origin Context
// ============================================================================

/// Caller-owned provenance attached to a job.
///
/// The queue stores and returns it verbatim and never reads its entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct OriginContext(Map<String, Value>);

impl OriginContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Copy entries from `other` whose keys are not present yet.
    pub fn extend_missing(&mut self, other: &OriginContext) {
        for (key, value) in &other.0 {
            if !self.0.contains_key(key) {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Map<String, Value>> for OriginContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// Job Descriptor
// ============================================================================

/// Request to enqueue one unit of download work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDescriptor {
    /// Resource to download; source of the dedup key.
    pub target_url: String,
    /// URL used when the download is retried.
    pub retry_url: String,
    /// Kind of resource behind `target_url`.
    pub resource_type: String,
    /// Display name of the resource.
    pub display_name: String,
    /// Display artist of the resource.
    pub display_artist: String,
    /// Caller provenance.
    #[serde(default)]
    pub origin: OriginContext,
}

impl JobDescriptor {
    /// Descriptor for an album download; retries go to the same URL.
    pub fn album(
        url: impl Into<String>,
        name: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            retry_url: url.clone(),
            target_url: url,
            resource_type: ALBUM_RESOURCE_TYPE.to_string(),
            display_name: name.into(),
            display_artist: artist.into(),
            origin: OriginContext::new(),
        }
    }

    /// Attach provenance.
    pub fn with_origin(mut self, origin: OriginContext) -> Self {
        self.origin = origin;
        self
    }
}

// ============================================================================
// Job Status
// ============================================================================

/// Current status of a job.
///
/// State machine flow:
/// ```text
/// submit -> Queued -> Processing -> Complete
///             |           |
///             +-----------+-> Error
///
/// submit -> Duplicate (terminal, another active job owns the target)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobStatus {
    /// Admitted, waiting for an executor.
    Queued,
    /// Picked up by an executor.
    Processing,
    /// Finished successfully (terminal).
    Complete,
    /// Failed (terminal).
    Error { message: String },
    /// Rejected at submission because `existing_job_id` already owns the
    /// target (terminal).
    Duplicate {
        existing_job_id: String,
        message: String,
    },
}

impl JobStatus {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Error { .. } | JobStatus::Duplicate { .. }
        )
    }

    /// Returns true if the job holds its target for deduplication.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Processing)
    }

    /// Returns the state type as a string (for filtering).
    pub fn state_type(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Error { .. } => "error",
            JobStatus::Duplicate { .. } => "duplicate",
        }
    }

    /// Status code under the polling contract, where duplicates report `error`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            JobStatus::Queued => StatusCode::Queued,
            JobStatus::Processing => StatusCode::Processing,
            JobStatus::Complete => StatusCode::Complete,
            JobStatus::Error { .. } | JobStatus::Duplicate { .. } => StatusCode::Error,
        }
    }

    /// The job owning the target, for duplicates.
    pub fn existing_job_id(&self) -> Option<&str> {
        match self {
            JobStatus::Duplicate {
                existing_job_id, ..
            } => Some(existing_job_id),
            _ => None,
        }
    }

    /// Human-readable message of error and duplicate states.
    pub fn message(&self) -> Option<&str> {
        match self {
            JobStatus::Error { message } | JobStatus::Duplicate { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether an executor may move a job from this state to `next`.
    ///
    /// `Duplicate` is only ever assigned at submission.
    pub fn can_transition_to(&self, next: &JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Queued, JobStatus::Error { .. })
                | (JobStatus::Processing, JobStatus::Complete)
                | (JobStatus::Processing, JobStatus::Error { .. })
        )
    }
}

/// Status code reported to pollers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Queued,
    Processing,
    Complete,
    Error,
}

/// What a poller sees for a job: a status code plus an optional
/// `existing_job_id` that marks an `error` as a duplicate rejection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobStatusView {
    pub job_id: String,
    pub status: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_job_id: Option<String>,
}

impl JobStatusView {
    /// Returns true for an `error` that reports a duplicate submission.
    pub fn is_duplicate(&self) -> bool {
        self.status == StatusCode::Error && self.existing_job_id.is_some()
    }
}

// ============================================================================
// Job
// ============================================================================

/// A unit of download work tracked by the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Unique identifier (UUID), assigned at submission.
    pub id: String,
    /// Resource to download.
    pub target_url: String,
    /// Normalized `target_url` used for deduplication.
    pub dedup_key: String,
    /// URL used when the download is retried.
    pub retry_url: String,
    /// Kind of resource.
    pub resource_type: String,
    /// Display name of the resource.
    pub display_name: String,
    /// Display artist of the resource.
    pub display_artist: String,
    /// Caller provenance, returned verbatim.
    pub origin: OriginContext,
    /// Current status.
    pub status: JobStatus,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a freshly submitted job with a new ID.
    pub fn new(descriptor: JobDescriptor, dedup_key: impl Into<String>, status: JobStatus) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target_url: descriptor.target_url,
            dedup_key: dedup_key.into(),
            retry_url: descriptor.retry_url,
            resource_type: descriptor.resource_type,
            display_name: descriptor.display_name,
            display_artist: descriptor.display_artist,
            origin: descriptor.origin,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Poller view of this job's status.
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.id.clone(),
            status: self.status.status_code(),
            message: self.status.message().map(str::to_string),
            existing_job_id: self.status.existing_job_id().map(str::to_string),
        }
    }

    /// Returns true if this job was rejected as a duplicate.
    pub fn is_duplicate(&self) -> bool {
        matches!(self.status, JobStatus::Duplicate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn duplicate() -> JobStatus {
        JobStatus::Duplicate {
            existing_job_id: "job-1".to_string(),
            message: "already queued".to_string(),
        }
    }

    #[test]
    fn test_queued_state() {
        let state = JobStatus::Queued;
        assert!(state.is_active());
        assert!(!state.is_terminal());
        assert_eq!(state.state_type(), "queued");
        assert_eq!(state.existing_job_id(), None);
        assert_eq!(state.message(), None);
    }

    #[test]
    fn test_terminal_states() {
        for state in [
            JobStatus::Complete,
            JobStatus::Error {
                message: "boom".to_string(),
            },
            duplicate(),
        ] {
            assert!(state.is_terminal(), "{:?} should be terminal", state);
            assert!(!state.is_active());
        }
    }

    #[test]
    fn test_existing_job_id_only_on_duplicate() {
        assert_eq!(duplicate().existing_job_id(), Some("job-1"));
        assert_eq!(
            JobStatus::Error {
                message: "boom".to_string()
            }
            .existing_job_id(),
            None
        );
    }

    #[test]
    fn test_duplicate_reports_error_code() {
        assert_eq!(duplicate().status_code(), StatusCode::Error);
        assert_eq!(duplicate().state_type(), "duplicate");
    }

    #[test]
    fn test_transitions() {
        let error = JobStatus::Error {
            message: "x".to_string(),
        };
        assert!(JobStatus::Queued.can_transition_to(&JobStatus::Processing));
        assert!(JobStatus::Queued.can_transition_to(&error));
        assert!(JobStatus::Processing.can_transition_to(&JobStatus::Complete));
        assert!(JobStatus::Processing.can_transition_to(&error));

        assert!(!JobStatus::Queued.can_transition_to(&JobStatus::Complete));
        assert!(!JobStatus::Queued.can_transition_to(&duplicate()));
        assert!(!JobStatus::Complete.can_transition_to(&JobStatus::Processing));
        assert!(!error.can_transition_to(&JobStatus::Queued));
        assert!(!duplicate().can_transition_to(&JobStatus::Processing));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(duplicate()).unwrap();
        assert_eq!(
            json,
            json!({ "type": "duplicate", "existing_job_id": "job-1", "message": "already queued" })
        );

        let parsed: JobStatus = serde_json::from_str(r#"{"type":"processing"}"#).unwrap();
        assert_eq!(parsed, JobStatus::Processing);
    }

    #[test]
    fn test_status_view_for_duplicate() {
        let job = Job::new(
            JobDescriptor::album("https://open.spotify.com/album/x", "X", "Y"),
            "https://open.spotify.com/album/x",
            duplicate(),
        );

        let view = job.status_view();
        assert!(view.is_duplicate());
        assert_eq!(view.job_id, job.id);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["existing_job_id"], "job-1");
    }

    #[test]
    fn test_status_view_for_queued_omits_optional_fields() {
        let job = Job::new(
            JobDescriptor::album("u", "n", "a"),
            "u",
            JobStatus::Queued,
        );

        let json = serde_json::to_value(job.status_view()).unwrap();
        assert_eq!(json["status"], "queued");
        assert!(json.get("message").is_none());
        assert!(json.get("existing_job_id").is_none());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = Job::new(JobDescriptor::album("u", "n", "a"), "u", JobStatus::Queued);
        let b = Job::new(JobDescriptor::album("u", "n", "a"), "u", JobStatus::Queued);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_album_descriptor() {
        let descriptor = JobDescriptor::album("https://x/album/1", "Name", "Artist");
        assert_eq!(descriptor.retry_url, descriptor.target_url);
        assert_eq!(descriptor.resource_type, ALBUM_RESOURCE_TYPE);
        assert!(descriptor.origin.is_empty());
    }

    #[test]
    fn test_origin_context_extend_missing_keeps_existing() {
        let mut origin = OriginContext::new().with("type", "album");
        origin.extend_missing(
            &OriginContext::new()
                .with("type", "artist")
                .with("client", "web"),
        );

        assert_eq!(origin.get("type"), Some(&json!("album")));
        assert_eq!(origin.get("client"), Some(&json!("web")));
        assert_eq!(origin.len(), 2);
    }

    #[test]
    fn test_origin_context_is_transparent() {
        let origin = OriginContext::new().with("parent_request_type", "artist");
        assert_eq!(
            serde_json::to_string(&origin).unwrap(),
            r#"{"parent_request_type":"artist"}"#
        );
    }
}
