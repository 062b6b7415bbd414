//! Prometheus metrics for the lifecycle engine.
//!
//! Every recording function compiles to a no-op without the `prometheus` feature.

#[cfg(feature = "prometheus")]
use metrics::counter;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a tokio runtime.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .install()
        .map_err(MetricsError::Install)?;

    tracing::info!(listen = %config.listen, "Prometheus metrics endpoint started");
    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if config.enabled {
        tracing::warn!(
            "Metrics are enabled in config but the 'prometheus' feature is not compiled. \
             Rebuild with: cargo build --features prometheus"
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record records moved through a lifecycle step (archive, anonymize, delete, notify).
pub fn record_lifecycle_transition(step: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "lifecycle_transitions_total",
            "step" => step.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (step, count);
    }
}

/// Record a lifecycle step that aborted its pass.
pub fn record_lifecycle_error(step: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "lifecycle_errors_total",
            "step" => step.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = step;
    }
}

/// Record a deletion warning send attempt.
///
/// Outcomes: `sent`, `failed`.
pub fn record_notification(outcome: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "deletion_warnings_total",
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = outcome;
    }
}

/// Record a completed erasure request.
pub fn record_erasure(deleted: u64, retained: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("erasure_requests_completed_total").increment(1);
        counter!("erasure_records_total", "outcome" => "deleted").increment(deleted);
        counter!("erasure_records_total", "outcome" => "retained").increment(retained);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (deleted, retained);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
