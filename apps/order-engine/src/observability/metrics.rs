//! Prometheus metrics for the order engine.
//!
//! Counters and histograms for the order lifecycle: submissions, triggers,
//! dispatch attempts, quota decisions, retries and recurrences.
//!
//! # Example
//!
//! ```ignore
//! use order_engine::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_dispatch_attempt("completed", 0.015);
//! ```

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for venue latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // Venue round trips from 5ms to 30s
            latency_buckets: vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration listening on `port`.
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Submission & Trigger Metrics
// ============================================================================

/// Record an order submission.
///
/// # Arguments
///
/// * `advanced_type` - e.g. `"none"`, `"trailing_stop"`, `"recurring_dca"`
/// * `created` - false when an existing order was returned for the key
pub fn record_order_submitted(advanced_type: &str, created: bool) {
    counter!(
        "orders_submitted_total",
        "advanced_type" => advanced_type.to_string(),
        "result" => if created { "created" } else { "duplicate" }
    )
    .increment(1);
}

/// Record a trigger firing.
pub fn record_trigger_fired(reason: &str) {
    counter!("triggers_fired_total", "reason" => reason.to_string()).increment(1);
}

/// Record an evaluation deferred for lack of a fresh price.
pub fn record_evaluation_deferred(reason: &str) {
    counter!("evaluations_deferred_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Dispatch Metrics
// ============================================================================

/// Record a venue dispatch attempt.
///
/// # Arguments
///
/// * `outcome` - `"completed"`, `"transient_error"` or `"permanent_error"`
/// * `latency_seconds` - venue round trip in seconds
pub fn record_dispatch_attempt(outcome: &str, latency_seconds: f64) {
    counter!("dispatch_attempts_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("dispatch_latency_seconds", "outcome" => outcome.to_string())
        .record(latency_seconds);
}

/// Record a dispatch skipped because another worker won the status CAS.
pub fn record_dispatch_conflict() {
    counter!("dispatch_conflicts_total").increment(1);
}

/// Record a retry scheduled after a transient failure.
pub fn record_retry_scheduled() {
    counter!("retries_scheduled_total").increment(1);
}

/// Record an order reaching `failed`.
pub fn record_order_failed(reason: &str) {
    counter!("orders_failed_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Quota & Recurrence Metrics
// ============================================================================

/// Record a quota decision.
///
/// # Arguments
///
/// * `decision` - `"granted"`, `"denied"` or `"soft_breach"`
pub fn record_quota_decision(decision: &str) {
    counter!("quota_decisions_total", "decision" => decision.to_string()).increment(1);
}

/// Record a recurring order re-armed.
pub fn record_recurrence_armed() {
    counter!("recurrences_armed_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_config_default() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(!config.latency_buckets.is_empty());
    }

    #[test]
    fn metrics_config_with_port() {
        let config = MetricsConfig::with_port(9191);
        assert_eq!(config.listen_addr.port(), 9191);
    }

    #[test]
    fn recording_without_exporter_is_a_no_op() {
        record_order_submitted("none", true);
        record_trigger_fired("market");
        record_dispatch_attempt("completed", 0.01);
        record_quota_decision("denied");
        record_recurrence_armed();
    }
}
