//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by route pattern and status
//! - `dispatch_request_duration_seconds` (histogram): dispatch latency
//! - `dispatch_routes_registered` (gauge): size of the route table
//! - `dispatch_socket_messages_total` (counter): inbound socket frames by event
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The route label is the pattern, never the raw path, to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Route label for requests that matched nothing.
pub const UNMATCHED: &str = "none";

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, route: &str, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatch_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_routes_registered(total: usize) {
    metrics::gauge!("dispatch_routes_registered").set(total as f64);
}

pub fn record_socket_message(event: &str) {
    metrics::counter!("dispatch_socket_messages_total", "event" => event.to_string()).increment(1);
}
