//! Metrics collection and exposition.
//!
//! # Metrics
//! - `image_proxy_requests_total` (counter): requests by route, status
//! - `image_proxy_request_duration_seconds` (histogram): latency by route
//! - `image_proxy_tokens_issued_total` (counter)
//! - `image_proxy_verify_failures_total` (counter): by reason
//! - `image_proxy_upstream_errors_total` (counter): by kind
//! - `image_proxy_rate_limited_total` (counter): by route
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Labels are fixed tags, never caller-supplied strings

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "image_proxy_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("image_proxy_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_token_issued() {
    metrics::counter!("image_proxy_tokens_issued_total").increment(1);
}

pub fn record_verify_failure(reason: &'static str) {
    metrics::counter!("image_proxy_verify_failures_total", "reason" => reason).increment(1);
}

pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("image_proxy_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn record_rate_limited(route: &'static str) {
    metrics::counter!("image_proxy_rate_limited_total", "route" => route).increment(1);
}
