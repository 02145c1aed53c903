//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests by outcome, relayed lines, upstream latency)
//! - Expose a Prometheus-compatible scrape endpoint when enabled
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by outcome
//! - `proxy_sse_lines_total` (counter): SSE lines by action (forwarded, dropped)
//! - `proxy_upstream_response_seconds` (histogram): time to upstream response head
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Low-overhead metric updates (atomic operations)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Request outcomes used as the `outcome` label.
pub mod outcome {
    pub const STREAMED: &str = "streamed";
    pub const CLIENT_ERROR: &str = "client_error";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const CANCELLED: &str = "cancelled";
    pub const STREAM_FAULT: &str = "stream_fault";
}

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(outcome: &'static str) {
    counter!("proxy_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_sse_line(action: &'static str) {
    counter!("proxy_sse_lines_total", "action" => action).increment(1);
}

pub fn record_upstream_latency(started: Instant) {
    histogram!("proxy_upstream_response_seconds").record(started.elapsed().as_secs_f64());
}
