use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::CatalogConfig;
use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Job queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// SQLite database holding job records.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("discofetch.db")
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub catalog: SanitizedCatalogConfig,
    pub queue: QueueConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized catalog config (API token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    pub base_url: String,
    pub provider_host: String,
    pub timeout_secs: u64,
    pub max_pages: u32,
    pub api_token_configured: bool,
    pub user_agent: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            catalog: SanitizedCatalogConfig {
                base_url: config.catalog.base_url.clone(),
                provider_host: config.catalog.provider_host.clone(),
                timeout_secs: config.catalog.timeout_secs,
                max_pages: config.catalog.max_pages,
                api_token_configured: config
                    .catalog
                    .api_token
                    .as_ref()
                    .is_some_and(|t| !t.is_empty()),
                user_agent: config.catalog.user_agent.clone(),
            },
            queue: config.queue.clone(),
            orchestrator: config.orchestrator.clone(),
        }
    }
}
