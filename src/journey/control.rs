//! Journey control.
//!
//! # Responsibilities
//! - Plan a congestion-aware route and register it as a journey
//! - Replace the monitored journey when a reroute is accepted
//! - Keep the old journey if the replacement cannot be planned

use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::{ApiClient, ApiError};
use crate::journey::monitor::JourneyMonitor;
use crate::journey::types::{ActiveJourney, JourneyError, JourneyId};
use crate::negotiation::RerouteAccepted;
use crate::traffic::IntersectionId;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("route planning failed: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Journey(#[from] JourneyError),
}

/// Compute the fastest congestion-aware route and start a journey on it.
pub async fn plan_journey(
    api: &ApiClient,
    from: &IntersectionId,
    to: &IntersectionId,
) -> Result<ActiveJourney, PlanError> {
    let route = api.fastest_route(from, to, true).await?;
    tracing::info!(
        route_id = %route.route_id,
        distance_km = route.distance_km,
        eta_minutes = route.estimated_time_minutes,
        via = %route.intersections.join(" → "),
        "Route planned"
    );
    let started = api.start_journey(route.route_id, &route.path).await?;
    Ok(ActiveJourney::new(started.journey_id, route.route_id, route.path)?)
}

/// Recalculates the journey each time a reroute is accepted.
#[derive(Clone)]
pub struct JourneyControl {
    api: ApiClient,
    monitor: JourneyMonitor,
}

impl JourneyControl {
    pub fn new(api: ApiClient, monitor: JourneyMonitor) -> Self {
        Self { api, monitor }
    }

    /// Handle accepts until the negotiator goes away.
    pub async fn run(self, mut accepts: mpsc::UnboundedReceiver<RerouteAccepted>) {
        while let Some(accepted) = accepts.recv().await {
            self.reroute(accepted).await;
        }
        tracing::debug!("Journey control stopped");
    }

    /// Replace the accepted journey with a freshly planned one.
    ///
    /// Returns the new journey, or `None` when the accept no longer applies
    /// or planning failed.
    pub async fn reroute(&self, accepted: RerouteAccepted) -> Option<JourneyId> {
        let current = match self.monitor.active_journey() {
            Some(current) if current.journey_id == accepted.journey_id => current,
            Some(current) => {
                tracing::debug!(
                    journey_id = %accepted.journey_id,
                    current = %current.journey_id,
                    "Reroute accepted for a replaced journey"
                );
                return None;
            }
            None => {
                tracing::debug!(journey_id = %accepted.journey_id, "Reroute accepted after journey ended");
                return None;
            }
        };

        // No ticks on the old path while the new one is planned.
        self.monitor.stop();
        tracing::info!(journey_id = %current.journey_id, "Recalculating route");

        match plan_journey(&self.api, current.origin(), current.destination()).await {
            Ok(journey) => {
                let journey_id = journey.journey_id;
                tracing::info!(
                    previous = %current.journey_id,
                    journey_id = %journey_id,
                    "Journey rerouted"
                );
                self.monitor.start(journey);
                Some(journey_id)
            }
            Err(e) => {
                tracing::warn!(
                    journey_id = %current.journey_id,
                    error = %e,
                    "Reroute failed, continuing on current route"
                );
                if self.monitor.current_journey().is_none() {
                    self.monitor.start(ActiveJourney::clone(&current));
                }
                None
            }
        }
    }
}
