//! Work queue: job records, duplicate detection and status tracking.

mod dedup;
mod dispatch;
mod manager;
mod sqlite_store;
mod store;
mod types;

pub use dedup::normalize_target_url;
pub use dispatch::{ChannelDispatcher, DispatchError, JobDispatcher};
pub use manager::{JobQueue, QueueError};
pub use sqlite_store::SqliteJobStore;
pub use store::{JobFilter, JobStore, JobStoreError};
pub use types::*;
