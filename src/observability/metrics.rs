//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define lifecycle metrics (hook starts, failures, abandonment, shutdown latency)
//! - Expose a Prometheus-compatible metrics endpoint when enabled
//!
//! # Metrics
//! - `lifecycle_hooks_started_total` (counter): hooks launched, by hook
//! - `lifecycle_hook_failures_total` (counter): hook failures, by hook and phase
//! - `lifecycle_hooks_abandoned_total` (counter): hooks that missed the shutdown timeout
//! - `lifecycle_hook_shutdown_duration_seconds` (histogram): time spent collecting a hook's outcomes, by hook
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const HOOKS_STARTED_TOTAL: &str = "lifecycle_hooks_started_total";
pub const HOOK_FAILURES_TOTAL: &str = "lifecycle_hook_failures_total";
pub const HOOKS_ABANDONED_TOTAL: &str = "lifecycle_hooks_abandoned_total";
pub const SHUTDOWN_DURATION_SECONDS: &str = "lifecycle_hook_shutdown_duration_seconds";

/// Lifecycle phase a failure was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Stop,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Stop => "stop",
        }
    }
}

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_hook_started(hook: &str) {
    counter!(HOOKS_STARTED_TOTAL, "hook" => hook.to_string()).increment(1);
}

pub fn record_hook_failure(hook: &str, phase: Phase) {
    counter!(
        HOOK_FAILURES_TOTAL,
        "hook" => hook.to_string(),
        "phase" => phase.as_str()
    )
    .increment(1);
}

pub fn record_hook_abandoned(hook: &str) {
    counter!(HOOKS_ABANDONED_TOTAL, "hook" => hook.to_string()).increment(1);
}

pub fn record_shutdown_duration(hook: &str, started: Instant) {
    histogram!(SHUTDOWN_DURATION_SECONDS, "hook" => hook.to_string())
        .record(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_hook_started("db");
        record_hook_failure("db", Phase::Stop);
        record_hook_abandoned("db");
        record_shutdown_duration("db", Instant::now());
    }

    #[test]
    fn test_metric_names() {
        for name in [
            HOOKS_STARTED_TOTAL,
            HOOK_FAILURES_TOTAL,
            HOOKS_ABANDONED_TOTAL,
            SHUTDOWN_DURATION_SECONDS,
        ] {
            assert!(name.starts_with("lifecycle_"));
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
        assert_eq!(Phase::Start.as_str(), "start");
        assert_eq!(Phase::Stop.as_str(), "stop");
    }
}
