//! Recording job dispatcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::queue::{DispatchError, Job, JobDispatcher};

/// Dispatcher that records every job it receives.
///
/// Can be told to reject the next dispatch to exercise failure handling.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    dispatched: Arc<RwLock<Vec<Job>>>,
    next_error: Arc<RwLock<Option<DispatchError>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next dispatch fail.
    pub async fn set_next_error(&self, error: DispatchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Jobs dispatched so far.
    pub async fn dispatched(&self) -> Vec<Job> {
        self.dispatched.read().await.clone()
    }

    /// IDs of jobs dispatched so far, in order.
    pub async fn dispatched_ids(&self) -> Vec<String> {
        self.dispatched
            .read()
            .await
            .iter()
            .map(|job| job.id.clone())
            .collect()
    }
}

#[async_trait]
impl JobDispatcher for RecordingDispatcher {
    async fn dispatch(&self, job: &Job) -> Result<(), DispatchError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.dispatched.write().await.push(job.clone());
        Ok(())
    }
}
