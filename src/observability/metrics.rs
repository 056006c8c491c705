//! Metrics collection and exposition.
//!
//! # Metrics
//! - `traffic_sync_connection_state` (gauge): 0=closed, 1=connecting, 2=open, 3=closing
//! - `traffic_sync_reconnects_total` (counter): reconnect attempts scheduled
//! - `traffic_sync_messages_total` (counter): inbound messages by kind
//! - `traffic_sync_dropped_messages_total` (counter): malformed messages by reason
//! - `traffic_sync_store_size` (gauge): intersections in the traffic store
//! - `traffic_sync_reroute_triggers_total` (counter)
//! - `traffic_sync_negotiations_total` (counter): resolved negotiations by outcome
//! - `traffic_sync_query_failures_total` (counter): failed monitor ticks

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_state(state: f64) {
    ::metrics::gauge!("traffic_sync_connection_state").set(state);
}

pub fn record_reconnect() {
    ::metrics::counter!("traffic_sync_reconnects_total").increment(1);
}

pub fn record_message(kind: &'static str) {
    ::metrics::counter!("traffic_sync_messages_total", "kind" => kind).increment(1);
}

pub fn record_dropped_message(reason: &'static str) {
    ::metrics::counter!("traffic_sync_dropped_messages_total", "reason" => reason).increment(1);
}

pub fn record_store_size(size: usize) {
    ::metrics::gauge!("traffic_sync_store_size").set(size as f64);
}

pub fn record_reroute_trigger() {
    ::metrics::counter!("traffic_sync_reroute_triggers_total").increment(1);
}

pub fn record_negotiation(outcome: &'static str) {
    ::metrics::counter!("traffic_sync_negotiations_total", "outcome" => outcome).increment(1);
}

pub fn record_query_failure() {
    ::metrics::counter!("traffic_sync_query_failures_total").increment(1);
}
