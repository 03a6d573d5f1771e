//! Observability module for metrics and logging.
//!
//! Prometheus metrics export and `tracing` subscriber setup for the order
//! engine.

mod logging;
mod metrics;

pub use logging::{LoggingError, build_filter, init_logging};
pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_dispatch_attempt, record_dispatch_conflict,
    record_evaluation_deferred, record_order_failed, record_order_submitted, record_quota_decision,
    record_recurrence_armed, record_retry_scheduled, record_trigger_fired,
};
