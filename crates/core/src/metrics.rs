//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Batch conversions (per route and outcome)
//! - The remote conversion service (requests per endpoint)
//! - Downloads, archives and intake rejections

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Per-item conversions by route and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("convertino_conversions_total", "Total item conversions"),
        &["route", "result"], // "success", "failed"
    )
    .unwrap()
});

/// Per-item conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "convertino_conversion_duration_seconds",
            "Duration of a single item conversion",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["route"],
    )
    .unwrap()
});

// =============================================================================
// Remote Service Metrics
// =============================================================================

/// Uploads to the conversion service by endpoint and result.
pub static GATEWAY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "convertino_gateway_requests_total",
            "Requests sent to the conversion service",
        ),
        &["endpoint", "result"],
    )
    .unwrap()
});

// =============================================================================
// Output Metrics
// =============================================================================

/// Saved artifacts by kind ("local", "remote") and result.
pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("convertino_downloads_total", "Artifacts saved"),
        &["kind", "result"],
    )
    .unwrap()
});

pub static ARCHIVES_BUILT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("convertino_archives_built_total", "ZIP archives written").unwrap()
});

/// Files refused at intake by reason.
pub static INTAKE_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "convertino_intake_rejections_total",
            "Files rejected when added to a file set",
        ),
        &["reason"], // "too_large", "not_accepted", "set_full"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(GATEWAY_REQUESTS.clone()),
        Box::new(DOWNLOADS_TOTAL.clone()),
        Box::new(ARCHIVES_BUILT.clone()),
        Box::new(INTAKE_REJECTIONS.clone()),
    ]
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
    registry
});

/// Encode all metrics as Prometheus text format.
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_touched_metrics() {
        // Vec metrics only appear once a label set has been used
        CONVERSIONS_TOTAL.with_label_values(&["test", "success"]).inc();
        CONVERSION_DURATION.with_label_values(&["test"]).observe(0.2);
        GATEWAY_REQUESTS.with_label_values(&["/test", "failed"]).inc();
        DOWNLOADS_TOTAL.with_label_values(&["local", "success"]).inc();
        INTAKE_REJECTIONS.with_label_values(&["too_large"]).inc();
        ARCHIVES_BUILT.inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("convertino_conversions_total"));
        assert!(output.contains("convertino_conversion_duration_seconds"));
        assert!(output.contains("convertino_gateway_requests_total"));
        assert!(output.contains("convertino_downloads_total"));
        assert!(output.contains("convertino_archives_built_total"));
        assert!(output.contains("convertino_intake_rejections_total"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_all_metrics_count() {
        assert_eq!(all_metrics().len(), 6);
    }
}
