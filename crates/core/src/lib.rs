pub mod catalog;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod taxonomy;
pub mod testing;

pub use catalog::{
    ArtistLink, CatalogConfig, CatalogError, CatalogProvider, HttpCatalogProvider, Release,
    ReleaseGroup, ReleaseResolver, ReleaseType, ResolveError, UpstreamFetchError,
    ValidationError,
};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, QueueConfig, SanitizedConfig,
};
pub use orchestrator::{
    ArtistDownloadOutcome, ArtistDownloader, DuplicateRelease, OrchestratorConfig,
    OrchestratorError, QueuedRelease,
};
pub use queue::{
    ChannelDispatcher, DispatchError, Job, JobDescriptor, JobDispatcher, JobFilter, JobQueue,
    JobStatus, JobStatusView, JobStore, JobStoreError, OriginContext, QueueError,
    SqliteJobStore, StatusCode,
};
pub use taxonomy::{classify, matched_category, RequestedCategory, RequestedCategorySet};
