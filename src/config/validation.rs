//! Configuration validation.
//!
//! Serde handles syntax; this checks values: URL schemes, non-zero
//! intervals, threshold range. All problems are reported, not just the first.

use thiserror::Error;
use url::Url;

use crate::config::schema::{ReconnectStrategy, SyncConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: unsupported scheme '{scheme}', expected {expected}")]
    UnsupportedScheme {
        field: &'static str,
        scheme: String,
        expected: &'static str,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("monitor.congestion_threshold must be within [0, 100], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("stream.reconnect.max_delay_ms ({max}) is below delay_ms ({base})")]
    ReconnectCap { base: u64, max: u64 },

    #[error("observability.metrics_address: invalid socket address '{0}'")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &SyncConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "stream.url", &config.stream.url, &["ws", "wss"], "ws or wss");
    check_url(&mut errors, "api.base_url", &config.api.base_url, &["http", "https"], "http or https");

    let intervals = [
        ("stream.connect_timeout_ms", config.stream.connect_timeout_ms),
        ("stream.heartbeat_interval_ms", config.stream.heartbeat_interval_ms),
        ("stream.reconnect.delay_ms", config.stream.reconnect.delay_ms),
        ("monitor.poll_interval_ms", config.monitor.poll_interval_ms),
        ("negotiation.decision_window_ms", config.negotiation.decision_window_ms),
        ("api.request_timeout_secs", config.api.request_timeout_secs),
    ];
    for (field, value) in intervals {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    let threshold = config.monitor.congestion_threshold;
    if !(0.0..=100.0).contains(&threshold) {
        errors.push(ValidationError::ThresholdOutOfRange(threshold));
    }

    let reconnect = &config.stream.reconnect;
    if reconnect.strategy == ReconnectStrategy::Exponential && reconnect.max_delay_ms < reconnect.delay_ms {
        errors.push(ValidationError::ReconnectCap {
            base: reconnect.delay_ms,
            max: reconnect.max_delay_ms,
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: &str,
    schemes: &[&str],
    expected: &'static str,
) {
    match Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::UnsupportedScheme {
            field,
            scheme: url.scheme().to_string(),
            expected,
        }),
        Err(_) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SyncConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = SyncConfig::default();
        config.stream.url = "http://localhost:8000/ws".to_string();
        config.api.base_url = "not a url".to_string();
        config.monitor.poll_interval_ms = 0;
        config.monitor.congestion_threshold = 120.0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero {
            field: "monitor.poll_interval_ms"
        }));
        assert!(errors.contains(&ValidationError::ThresholdOutOfRange(120.0)));
        assert!(errors[0].to_string().contains("ws or wss"));
    }

    #[test]
    fn test_exponential_cap_checked() {
        let mut config = SyncConfig::default();
        config.stream.reconnect.strategy = ReconnectStrategy::Exponential;
        config.stream.reconnect.max_delay_ms = 1_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ReconnectCap { base: 5_000, max: 1_000 }]
        );
    }
}
