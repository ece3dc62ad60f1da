//! Prometheus metrics for the HTTP server.
//!
//! Request metrics are recorded by middleware. Campaign and scheduler gauges
//! are refreshed from the stores right before each scrape. Core pipeline
//! metrics are registered from `launchpro_core::metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use tracing::warn;

use launchpro_core::stoploss::ViolationFilter;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "launchpro_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 60.0, 900.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("launchpro_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "launchpro_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "launchpro_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Campaign Metrics
// =============================================================================

/// Campaigns by current status (collected dynamically).
pub static CAMPAIGNS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "launchpro_campaigns_by_status",
            "Current campaign count by status",
        ),
        &["status"],
    )
    .unwrap()
});

pub static CAMPAIGNS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "launchpro_campaigns_created_total",
        "Total campaigns created since startup",
    )
    .unwrap()
});

/// Unacknowledged stop-loss violations (collected dynamically).
pub static OPEN_VIOLATIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "launchpro_stop_loss_open_violations",
        "Unacknowledged stop-loss violations",
    )
    .unwrap()
});

pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "launchpro_scheduler_running",
        "Whether the launch scheduler is running (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Campaigns
    registry
        .register(Box::new(CAMPAIGNS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(CAMPAIGNS_CREATED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(OPEN_VIOLATIONS.clone()))
        .unwrap();
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();

    // Core metrics (queue, orchestrator, poller, stop-loss, cleanup)
    for metric in launchpro_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh gauges from current application state.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.campaigns().count_by_status() {
        Ok(counts) => {
            for (status, count) in counts {
                CAMPAIGNS_BY_STATUS
                    .with_label_values(&[status.as_str()])
                    .set(count);
            }
        }
        Err(e) => warn!(error = %e, "Failed to count campaigns for metrics"),
    }

    if let Ok(open) = state
        .violations()
        .count(&ViolationFilter::new().open_only())
    {
        OPEN_VIOLATIONS.set(open);
    }

    SCHEDULER_RUNNING.set(if state.scheduler().is_running() { 1 } else { 0 });
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/campaigns/550e8400-e29b-41d4-a716-446655440000/retry";
        assert_eq!(normalize_path(path), "/api/v1/campaigns/{id}/retry");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/stop-loss/violations/42/acknowledge";
        assert_eq!(
            normalize_path(path),
            "/api/v1/stop-loss/violations/{id}/acknowledge"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/queue/status"), "/api/v1/queue/status");
    }

    #[test]
    fn test_registry_contains_server_and_core_metrics() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();
        CAMPAIGNS_BY_STATUS.with_label_values(&["QUEUED"]).set(0);
        SCHEDULER_RUNNING.set(0);
        launchpro_core::metrics::CAMPAIGNS_LAUNCHED.inc_by(0);
        launchpro_core::metrics::QUEUE_INVOCATIONS
            .with_label_values(&["queue_empty"])
            .inc_by(0);

        let output = encode_metrics();

        assert!(output.contains("# HELP"));
        assert!(output.contains("launchpro_http_requests_total"));
        assert!(output.contains("launchpro_campaigns_by_status"));
        assert!(output.contains("launchpro_scheduler_running"));
        assert!(output.contains("launchpro_campaigns_launched_total"));
        assert!(output.contains("launchpro_queue_invocations_total"));
    }
}
