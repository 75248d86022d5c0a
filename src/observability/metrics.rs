//! Metrics collection.
//!
//! # Metrics
//! - `wallet_rpc_requests_total` (counter): calls by method, outcome
//! - `wallet_rpc_request_duration_seconds` (histogram): round-trip latency by method
//! - `wallet_estimations_total` (counter): fee/gas estimations by outcome
//! - `wallet_node_health` (gauge): 1=reachable, 0=unreachable
//!
//! Without an installed recorder every call is a no-op.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub fn record_rpc_call(method: &str, outcome: &'static str) {
    counter!(
        "wallet_rpc_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rpc_latency(method: &str, elapsed: Duration) {
    histogram!("wallet_rpc_request_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_estimation(outcome: &'static str) {
    counter!("wallet_estimations_total", "outcome" => outcome).increment(1);
}

pub fn record_node_health(healthy: bool) {
    gauge!("wallet_node_health").set(if healthy { 1.0 } else { 0.0 });
}
