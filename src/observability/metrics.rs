//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method, status, route kind
//! - `edge_request_duration_seconds` (histogram): end-to-end latency
//! - `edge_route_misses_total` (counter): requests no route matched
//! - `edge_store_errors_total` (counter): swallowed store reads by operation
//! - `router_registrations_total` (counter): registrar writes by action

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, route_kind: &str, start: Instant) {
    let status = status.to_string();
    counter!(
        "edge_requests_total",
        "method" => method.to_string(),
        "status" => status.clone(),
        "route" => route_kind.to_string()
    )
    .increment(1);
    histogram!(
        "edge_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status,
        "route" => route_kind.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_route_miss() {
    counter!("edge_route_misses_total").increment(1);
}

pub fn record_store_error(operation: &'static str) {
    counter!("edge_store_errors_total", "operation" => operation).increment(1);
}

pub fn record_registration(action: &'static str) {
    counter!("router_registrations_total", "action" => action).increment(1);
}
