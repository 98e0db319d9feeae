//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): by outcome
//! - `proxy_skipped_total` (counter): requests outside the configured context

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record one forwarded (or failed) request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request handed to the next handler.
pub fn record_skipped() {
    metrics::counter!("proxy_skipped_total").increment(1);
}
