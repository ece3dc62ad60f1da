//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue processor (invocation outcomes)
//! - Orchestrator (transitions, stage durations, failures, platform launches)
//! - Tracking-link poller (attempts, outcomes)
//! - Stop-loss monitor and stuck-state cleanup

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Queue Metrics
// =============================================================================

/// Queue processor invocations by outcome.
pub static QUEUE_INVOCATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "launchpro_queue_invocations_total",
            "Total queue processor invocations",
        ),
        &["outcome"], // "blocked", "queue_empty", "started", "already_claimed", "start_failed"
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics
// =============================================================================

/// Campaign status transitions.
pub static CAMPAIGN_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "launchpro_campaign_transitions_total",
            "Total campaign status transitions",
        ),
        &["from", "to"],
    )
    .unwrap()
});

/// Time spent in each pipeline stage.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "launchpro_stage_duration_seconds",
            "Duration of each campaign pipeline stage",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0]),
        &["stage"],
    )
    .unwrap()
});

/// Campaign failures by error kind.
pub static CAMPAIGNS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("launchpro_campaigns_failed_total", "Total failed campaigns"),
        &["kind"],
    )
    .unwrap()
});

/// Campaigns that reached ACTIVE.
pub static CAMPAIGNS_LAUNCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "launchpro_campaigns_launched_total",
        "Total campaigns that reached ACTIVE",
    )
    .unwrap()
});

/// Stale campaigns taken over by a resume.
pub static CAMPAIGNS_RESUMED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "launchpro_campaigns_resumed_total",
        "Total stale campaigns resumed",
    )
    .unwrap()
});

/// Platform target launches by platform and result.
pub static PLATFORM_LAUNCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "launchpro_platform_launches_total",
            "Total platform target launches",
        ),
        &["platform", "result"], // result: "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Tracking Poller Metrics
// =============================================================================

/// Upstream status queries issued by the poller.
pub static TRACKING_POLL_ATTEMPTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "launchpro_tracking_poll_attempts_total",
        "Total tracking status queries",
    )
    .unwrap()
});

/// Finished polls by outcome.
pub static TRACKING_POLL_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "launchpro_tracking_poll_outcomes_total",
            "Total finished tracking polls",
        ),
        &["outcome"], // "ready", "terminated", "timed_out"
    )
    .unwrap()
});

// =============================================================================
// Stop-Loss and Cleanup Metrics
// =============================================================================

/// Stop-loss scans run.
pub static STOP_LOSS_CHECKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("launchpro_stop_loss_checks_total", "Total stop-loss scans").unwrap()
});

/// New violations by kind.
pub static STOP_LOSS_VIOLATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "launchpro_stop_loss_violations_total",
            "Total stop-loss violations recorded",
        ),
        &["kind"],
    )
    .unwrap()
});

/// Alert deliveries by result.
pub static STOP_LOSS_ALERTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("launchpro_stop_loss_alerts_total", "Total stop-loss alerts"),
        &["result"], // "sent", "failed"
    )
    .unwrap()
});

/// Stale campaigns marked failed by cleanup.
pub static CLEANUP_MARKED_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "launchpro_cleanup_marked_failed_total",
        "Total stale campaigns marked failed",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(QUEUE_INVOCATIONS.clone()),
        // Orchestrator
        Box::new(CAMPAIGN_TRANSITIONS.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(CAMPAIGNS_FAILED.clone()),
        Box::new(CAMPAIGNS_LAUNCHED.clone()),
        Box::new(CAMPAIGNS_RESUMED.clone()),
        Box::new(PLATFORM_LAUNCHES.clone()),
        // Tracking
        Box::new(TRACKING_POLL_ATTEMPTS.clone()),
        Box::new(TRACKING_POLL_OUTCOMES.clone()),
        // Stop-loss and cleanup
        Box::new(STOP_LOSS_CHECKS.clone()),
        Box::new(STOP_LOSS_VIOLATIONS.clone()),
        Box::new(STOP_LOSS_ALERTS.clone()),
        Box::new(CLEANUP_MARKED_FAILED.clone()),
    ]
}
