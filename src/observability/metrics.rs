//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route class, status
//! - `gateway_request_duration_seconds` (histogram): time to response head
//! - `gateway_stream_bytes_total` (counter): audio bytes handed to clients
//! - `gateway_relay_failures_total` (counter): failed relays by route class

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::relay::RelayResult;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request (response head produced).
pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("gateway_requests_total", "route" => route, "status" => status.to_string()).increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route).record(start.elapsed().as_secs_f64());
}

/// Record the outcome of a relay.
pub fn record_relay(route: &'static str, result: &RelayResult) {
    if route == "stream" {
        counter!("gateway_stream_bytes_total").increment(result.bytes);
    }
    if result.error.is_some() {
        counter!("gateway_relay_failures_total", "route" => route).increment(1);
    }
}
