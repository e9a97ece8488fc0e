// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    // --- Gauges ---
    /// The number of connections whose task is currently running.
    pub static ref CONNECTED_SESSIONS: Gauge =
        register_gauge!("echo_connected_sessions", "Number of currently connected sessions.").unwrap();
    /// The number of sessions in the registry, refreshed on every scrape.
    pub static ref REGISTERED_SESSIONS: Gauge =
        register_gauge!("echo_registered_sessions", "Number of sessions held by the session registry.").unwrap();

    // --- Session Counters ---
    /// The total number of sessions admitted into the registry.
    pub static ref SESSIONS_ACCEPTED_TOTAL: Counter =
        register_counter!("echo_sessions_accepted_total", "Total number of sessions admitted.").unwrap();
    /// The total number of sessions refused by admission control.
    pub static ref SESSIONS_REJECTED_TOTAL: Counter =
        register_counter!("echo_sessions_rejected_total", "Total number of sessions rejected by admission control.").unwrap();
    /// The total number of sessions evicted by the cron sweep.
    pub static ref IDLE_EVICTIONS_TOTAL: Counter =
        register_counter!("echo_idle_evictions_total", "Total number of sessions evicted for being idle.").unwrap();

    // --- Dispatch Counters ---
    /// The total number of packages handed to a command handler.
    pub static ref PACKAGES_PROCESSED_TOTAL: Counter =
        register_counter!("echo_packages_processed_total", "Total number of packages dispatched to a handler.").unwrap();
    /// The total number of handler invocations that returned an error.
    pub static ref HANDLER_FAILURES_TOTAL: Counter =
        register_counter!("echo_handler_failures_total", "Total number of failed handler invocations.").unwrap();
    /// Packages dropped before reaching a handler, labeled by reason.
    pub static ref DISCARDED_PACKAGES_TOTAL: CounterVec =
        register_counter_vec!("echo_discarded_packages_total", "Total number of discarded packages, labeled by reason.", &["reason"]).unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
