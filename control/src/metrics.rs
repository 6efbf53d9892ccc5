//! Controller metrics
//!
//! Per-item failures are contained and logged, so counters are the only
//! place their rate is visible.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    /// Controller metrics registry
    pub static ref CONTROLLER_METRICS_REGISTRY: Registry = Registry::new();

    /// Startup reconciliation actions (write/disable) by result
    static ref RECONCILE_ACTIONS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "reconcile_actions_total",
            "Total number of startup reconciliation actions",
        );
        let counter = IntCounterVec::new(opts, &["action", "result"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };

    /// Applied service watch events by result
    static ref SERVICE_EVENTS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "service_events_total",
            "Total number of applied service watch events",
        );
        let counter = IntCounterVec::new(opts, &["event", "result"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };

    /// Watch stream errors (skipped and logged, stream resumes)
    static ref WATCH_ERRORS_TOTAL: IntCounter = {
        let counter = IntCounter::new(
            "watch_errors_total",
            "Total number of service watch stream errors",
        )
        .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };
}

/// Record one startup reconciliation action
pub fn record_reconcile_action(action: &str, result: &str) {
    RECONCILE_ACTIONS_TOTAL
        .with_label_values(&[action, result])
        .inc();
}

/// Record one applied service event
pub fn record_service_event(event: &str, result: &str) {
    SERVICE_EVENTS_TOTAL
        .with_label_values(&[event, result])
        .inc();
}

/// Record one watch stream error
pub fn record_watch_error() {
    WATCH_ERRORS_TOTAL.inc();
}

/// Gather controller metrics in Prometheus text format
pub fn gather() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&CONTROLLER_METRICS_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
