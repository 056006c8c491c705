//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sync layer.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Streaming connection to the traffic server.
    pub stream: StreamConfig,

    /// Journey congestion polling.
    pub monitor: MonitorConfig,

    /// Reroute decision window.
    pub negotiation: NegotiationConfig,

    /// HTTP collaborator endpoints.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Streaming connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// WebSocket endpoint (e.g., "ws://localhost:8000/ws").
    pub url: String,

    /// Handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Keep-alive ping interval in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// Close the transport after this long without any inbound frame, on top
    /// of remote close and transport errors. 0 (the default) disables it.
    pub liveness_timeout_ms: u64,

    /// Reconnect scheduling after a drop.
    pub reconnect: ReconnectConfig,
}

impl StreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Never zero, so it is always a valid timer period.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn liveness_timeout(&self) -> Option<Duration> {
        (self.liveness_timeout_ms > 0).then(|| Duration::from_millis(self.liveness_timeout_ms))
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            connect_timeout_ms: 10_000,
            heartbeat_interval_ms: 30_000,
            liveness_timeout_ms: 0,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// How the delay before a reconnect attempt is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    /// Always wait `delay_ms`.
    Fixed,
    /// Double from `delay_ms` per consecutive failure, capped at `max_delay_ms`, with jitter.
    Exponential,
}

/// Reconnect configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub strategy: ReconnectStrategy,

    /// Base delay in milliseconds.
    pub delay_ms: u64,

    /// Upper bound for the exponential strategy in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: ReconnectStrategy::Fixed,
            delay_ms: 5_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Where the journey monitor reads congestion from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficSourceKind {
    /// The store kept current by the streaming connection.
    Stream,
    /// Query `GET /api/traffic/all` on every tick.
    Api,
}

/// Journey monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Congestion percentage at which a reroute is offered.
    pub congestion_threshold: f64,

    pub source: TrafficSourceKind,
}

impl MonitorConfig {
    /// Never zero, so it is always a valid timer period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 15_000,
            congestion_threshold: 80.0,
            source: TrafficSourceKind::Stream,
        }
    }
}

/// Reroute negotiation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// How long the user has to answer, in milliseconds.
    pub decision_window_ms: u64,

    /// Submit accept/decline answers to the route-change endpoint.
    pub submit_decisions: bool,

    /// Also submit a decline to the server when the window times out.
    pub notify_server_on_timeout: bool,
}

impl NegotiationConfig {
    pub fn decision_window(&self) -> Duration {
        Duration::from_millis(self.decision_window_ms)
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            decision_window_ms: 3_000,
            submit_decisions: true,
            notify_server_on_timeout: false,
        }
    }
}

/// HTTP collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the traffic server (e.g., "http://localhost:8000").
    pub base_url: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
