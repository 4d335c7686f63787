//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the release ID in `callback_url_template`.
pub const RELEASE_ID_PLACEHOLDER: &str = "{release_id}";

/// Configuration for the artist download orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Categories downloaded when the caller does not name any.
    #[serde(default = "default_categories")]
    pub default_categories: String,

    /// Maximum number of queue submissions in flight per run.
    #[serde(default = "default_submit_concurrency")]
    pub submit_concurrency: usize,

    /// Link recorded as `original_url` in each job's provenance, e.g.
    /// `https://app.example/album/{release_id}`. Omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url_template: Option<String>,
}

fn default_categories() -> String {
    "album,single,compilation".to_string()
}

fn default_submit_concurrency() -> usize {
    4
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_categories: default_categories(),
            submit_concurrency: default_submit_concurrency(),
            callback_url_template: None,
        }
    }
}

impl OrchestratorConfig {
    /// Expand `callback_url_template` for a release.
    pub fn callback_url(&self, release_id: &str) -> Option<String> {
        self.callback_url_template
            .as_ref()
            .map(|template| template.replace(RELEASE_ID_PLACEHOLDER, release_id))
    }
}
