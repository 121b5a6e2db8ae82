//! Metrics collection and exposition.
//!
//! # Metrics
//! - `multiclient_requests_total` (counter): logical requests by method, outcome
//! - `multiclient_attempts_total` (counter): endpoint attempts, retries included
//! - `multiclient_request_duration_seconds` (histogram): logical request latency
//! - `multiclient_probes_total` (counter): health probes by result
//! - `multiclient_healthy_endpoints` (gauge): size of the latest health snapshot
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use reqwest::Method;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &Method, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "multiclient_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("multiclient_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_attempt() {
    metrics::counter!("multiclient_attempts_total").increment(1);
}

pub fn record_probe(healthy: bool) {
    let result = if healthy { "pass" } else { "fail" };
    metrics::counter!("multiclient_probes_total", "result" => result).increment(1);
}

pub fn record_healthy_endpoints(count: usize) {
    metrics::gauge!("multiclient_healthy_endpoints").set(count as f64);
}
