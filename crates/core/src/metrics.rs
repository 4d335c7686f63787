//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (artist runs, release classification)
//! - Queue (submissions, status transitions)
//! - Catalog provider (requests, latency)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Orchestrator Metrics
// =============================================================================

/// Artist download runs by result.
pub static ORCHESTRATION_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "discofetch_orchestration_runs_total",
            "Total artist download runs",
        ),
        &["result"], // "success", "validation_error", "upstream_error"
    )
    .unwrap()
});

/// Artist download run duration in seconds.
pub static ORCHESTRATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "discofetch_orchestration_duration_seconds",
            "Duration of artist download runs",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["result"],
    )
    .unwrap()
});

/// Releases seen by the orchestrator, by outcome.
pub static RELEASES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "discofetch_releases_processed_total",
            "Releases seen during artist downloads",
        ),
        &["outcome"], // "admitted", "filtered", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics
// =============================================================================

/// Job submissions by outcome.
pub static JOB_SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("discofetch_job_submissions_total", "Total job submissions"),
        &["outcome"], // "queued", "duplicate", "failed"
    )
    .unwrap()
});

/// Job status transitions by target status.
pub static JOB_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "discofetch_job_transitions_total",
            "Job status transitions after submission",
        ),
        &["status"], // "processing", "complete", "error"
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics
// =============================================================================

/// Catalog provider requests by status.
pub static CATALOG_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "discofetch_catalog_requests_total",
            "Total catalog provider requests",
        ),
        &["status"], // "success", "error"
    )
    .unwrap()
});

/// Catalog provider request latency.
pub static CATALOG_REQUEST_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "discofetch_catalog_request_duration_seconds",
            "Duration of catalog provider requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

/// Returns all core metrics for registration with a Prometheus registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(ORCHESTRATION_RUNS.clone()),
        Box::new(ORCHESTRATION_DURATION.clone()),
        Box::new(RELEASES_PROCESSED.clone()),
        // Queue
        Box::new(JOB_SUBMISSIONS.clone()),
        Box::new(JOB_TRANSITIONS.clone()),
        // Catalog
        Box::new(CATALOG_REQUESTS.clone()),
        Box::new(CATALOG_REQUEST_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        JOB_SUBMISSIONS.with_label_values(&["queued"]).inc();
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"discofetch_job_submissions_total".to_string()));
    }
}
