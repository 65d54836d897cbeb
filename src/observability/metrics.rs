//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by response status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_dispatch_errors_total` (counter): per-request failures by kind
//! - `gateway_links_active` (gauge): links currently listening
//! - `gateway_tls_fallbacks_total` (counter): links downgraded to direct mode

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(status: u16, start: Instant) {
    counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_request_error(kind: &'static str) {
    counter!("gateway_dispatch_errors_total", "kind" => kind).increment(1);
}

pub fn set_links_active(count: usize) {
    gauge!("gateway_links_active").set(count as f64);
}

pub fn record_tls_fallback() {
    counter!("gateway_tls_fallbacks_total").increment(1);
}
