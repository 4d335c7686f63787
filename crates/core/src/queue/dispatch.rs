//! Hand-off of admitted jobs to an execution backend.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::Job;

/// Error handing a job to the execution backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The backend has no room for more work.
    #[error("execution backend is full")]
    Full,

    /// The backend is gone.
    #[error("execution backend is closed")]
    Closed,
}

/// Receives jobs once they are admitted as queued.
///
/// Implementations must not block indefinitely; a backend that cannot take
/// the job right now returns an error instead.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job: &Job) -> Result<(), DispatchError>;
}

/// Forwards jobs over a bounded channel to an in-process worker.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<Job>,
}

impl ChannelDispatcher {
    pub fn new(tx: mpsc::Sender<Job>) -> Self {
        Self { tx }
    }

    /// Create a dispatcher and the receiving end for the worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl JobDispatcher for ChannelDispatcher {
    async fn dispatch(&self, job: &Job) -> Result<(), DispatchError> {
        self.tx.try_send(job.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::Full,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}
