//! Metrics collection and exposition.
//!
//! # Metrics
//! - `reconciler_cycles_total` (counter): cycles by loop, outcome
//! - `reconciler_transactions_submitted_total` (counter): accepted transactions by kind
//! - `reconciler_submission_failures_total` (counter): failed submissions by kind
//! - `reconciler_status_updates_total` (counter): status pushes by status, outcome
//! - `reconciler_malformed_candidates_total` (counter): dropped requests
//! - `reconciler_reroutes_total` (counter): funds requests sent back to account creation
//! - `reconciler_pending_requests` (gauge): size of each working set
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_cycle(loop_name: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("reconciler_cycles_total", "loop" => loop_name, "outcome" => outcome).increment(1);
}

pub fn record_submission(kind: &'static str, ok: bool) {
    if ok {
        counter!("reconciler_transactions_submitted_total", "kind" => kind).increment(1);
    } else {
        counter!("reconciler_submission_failures_total", "kind" => kind).increment(1);
    }
}

pub fn record_status_update(status: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("reconciler_status_updates_total", "status" => status, "outcome" => outcome).increment(1);
}

pub fn record_malformed_candidate() {
    counter!("reconciler_malformed_candidates_total").increment(1);
}

pub fn record_reroute() {
    counter!("reconciler_reroutes_total").increment(1);
}

pub fn record_pending(set: &'static str, size: usize) {
    gauge!("reconciler_pending_requests", "set" => set).set(size as f64);
}
