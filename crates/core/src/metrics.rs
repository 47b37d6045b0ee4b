//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Items (run outcomes)
//! - Media generation (contact sheets, screenshots)
//! - Uploads per destination
//! - Resource pool waits

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Runs and items
// =============================================================================

/// Processing runs started.
pub static RUNS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("spoilr_runs_started_total", "Total processing runs started").unwrap()
});

/// Items that left a run, by outcome.
pub static ITEMS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("spoilr_items_finished_total", "Total items finished"),
        &["outcome"], // "completed", "error", "reset"
    )
    .unwrap()
});

/// Item processing duration in seconds.
pub static ITEM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "spoilr_item_duration_seconds",
            "Duration from pending to a terminal state",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Generation and upload
// =============================================================================

/// Generation operations by kind and result.
pub static GENERATION_OPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "spoilr_generation_operations_total",
            "Total media generation operations",
        ),
        &["kind", "result"], // kind: "contact_sheet", "screenshot"; result: "success", "failed", "skipped"
    )
    .unwrap()
});

/// Uploads by destination and result.
pub static UPLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("spoilr_uploads_total", "Total artifact uploads"),
        &["destination", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Destination initialization failures.
pub static DESTINATION_INIT_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "spoilr_destination_init_failures_total",
            "Total destination initialization failures",
        ),
        &["destination"],
    )
    .unwrap()
});

// =============================================================================
// Resource pools
// =============================================================================

/// Time spent waiting for a pool permit.
pub static POOL_WAIT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "spoilr_pool_wait_seconds",
            "Time spent waiting for a resource pool permit",
        )
        .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
        &["pool"], // "generation", "upload"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runs and items
        Box::new(RUNS_STARTED.clone()),
        Box::new(ITEMS_FINISHED.clone()),
        Box::new(ITEM_DURATION.clone()),
        // Generation and upload
        Box::new(GENERATION_OPS.clone()),
        Box::new(UPLOADS.clone()),
        Box::new(DESTINATION_INIT_FAILURES.clone()),
        // Pools
        Box::new(POOL_WAIT_DURATION.clone()),
    ]
}
