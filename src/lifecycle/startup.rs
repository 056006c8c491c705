//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the shared state and every component in dependency order
//! - Open the stream last, once everything that consumes it exists
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Components get their collaborators through constructors; nothing is global

use std::sync::Arc;
use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::{SyncConfig, TrafficSourceKind};
use crate::journey::{JourneyControl, JourneyMonitor};
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::negotiation::{DecisionSink, RerouteNegotiator};
use crate::stream::ConnectionManager;
use crate::traffic::{TrafficSource, TrafficStateStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", format_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("failed to build API client: {0}")]
    Api(#[from] ApiError),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Every long-lived component of the sync layer, wired together.
pub struct SyncRuntime {
    pub store: TrafficStateStore,
    pub connection: ConnectionManager,
    pub negotiator: RerouteNegotiator,
    pub monitor: JourneyMonitor,
    pub api: ApiClient,
    shutdown: ShutdownSignal,
}

impl SyncRuntime {
    /// Build all components and start connecting the stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: SyncConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(StartupError::Config)?;

        let shutdown = ShutdownSignal::new();
        let store = TrafficStateStore::new();
        let api = ApiClient::new(&config.api)?;

        let sink: Option<Arc<dyn DecisionSink>> = if config.negotiation.submit_decisions {
            Some(Arc::new(api.clone()))
        } else {
            None
        };
        let negotiator = RerouteNegotiator::new(config.negotiation.clone(), sink);

        let source: Arc<dyn TrafficSource> = match config.monitor.source {
            TrafficSourceKind::Stream => Arc::new(store.clone()),
            TrafficSourceKind::Api => Arc::new(api.clone()),
        };
        let monitor = JourneyMonitor::new(source, config.monitor.clone(), negotiator.clone());

        let connection =
            ConnectionManager::new(config.stream.clone(), store.clone(), shutdown.clone());

        tracing::info!(
            stream_url = %config.stream.url,
            api_url = %api.base_url(),
            traffic_source = ?config.monitor.source,
            poll_ms = config.monitor.poll_interval_ms,
            threshold = config.monitor.congestion_threshold,
            decision_window_ms = config.negotiation.decision_window_ms,
            "Sync runtime starting"
        );
        connection.connect();

        Ok(Self {
            store,
            connection,
            negotiator,
            monitor,
            api,
            shutdown,
        })
    }

    /// Journey control bound to this runtime's API client and monitor.
    pub fn journey_control(&self) -> JourneyControl {
        JourneyControl::new(self.api.clone(), self.monitor.clone())
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Stop monitoring and close the stream without reconnecting.
    pub async fn shutdown(&self) {
        if let Some(journey_id) = self.monitor.stop() {
            tracing::debug!(journey_id = %journey_id, "Stopped journey on shutdown");
        }
        self.connection.shutdown().await;
        tracing::info!("Sync runtime stopped");
    }
}
