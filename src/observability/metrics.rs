//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_dispatch_total` (counter): route tree runs by outcome
//! - `router_dispatch_duration_seconds` (histogram): route tree latency
//! - `router_route_steps_total` (counter): route actions invoked
//! - `router_error_route_total` (counter): errors handed to the error route, by kind
//! - `service_calls_total` (counter): resolver calls by service, verb, outcome kind
//! - `transport_requests_total` (counter): transport deliveries by topic, verb, outcome
//! - `transport_request_duration_seconds` (histogram): transport latency
//!
//! # Design Decisions
//! - Labels carry static-ish values only (verb, kind, topic); never ids or payloads

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_dispatch(outcome: &str, start: Instant) {
    ::metrics::counter!("router_dispatch_total", "outcome" => outcome.to_string()).increment(1);
    ::metrics::histogram!("router_dispatch_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_route_step() {
    ::metrics::counter!("router_route_steps_total").increment(1);
}

pub fn record_error_route(kind: &str) {
    ::metrics::counter!("router_error_route_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_service_call(service: &str, verb: &str, kind: &str) {
    ::metrics::counter!(
        "service_calls_total",
        "service" => service.to_string(),
        "verb" => verb.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

pub fn record_transport_request(topic: &str, verb: &str, outcome: &str, start: Instant) {
    ::metrics::counter!(
        "transport_requests_total",
        "topic" => topic.to_string(),
        "verb" => verb.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    ::metrics::histogram!("transport_request_duration_seconds", "verb" => verb.to_string())
        .record(start.elapsed().as_secs_f64());
}
