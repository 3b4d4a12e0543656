//! Metrics collection and exposition.
//!
//! # Metrics
//! - `switchyard_messages_total` (counter): handled messages by status code
//! - `switchyard_dispatch_duration_seconds` (histogram): route + run + reply
//! - `switchyard_messages_in_flight` (gauge): messages being handled
//! - `switchyard_transport_errors_total` (counter): failed receives/replies
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exposition is optional

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// One message handled to completion.
pub fn record_message(status: i32, started: Instant) {
    ::metrics::counter!("switchyard_messages_total", "status" => status.to_string()).increment(1);
    ::metrics::histogram!("switchyard_dispatch_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}

pub fn record_in_flight(count: usize) {
    ::metrics::gauge!("switchyard_messages_in_flight").set(count as f64);
}

pub fn record_transport_error(operation: &'static str) {
    ::metrics::counter!("switchyard_transport_errors_total", "operation" => operation).increment(1);
}
