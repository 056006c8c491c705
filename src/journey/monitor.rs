//! Journey congestion monitor.
//!
//! # Responsibilities
//! - Poll congestion along the active path on a fixed interval
//! - Raise one reroute trigger per breaching tick, never while one is pending
//! - Discard ticks that complete after the journey was stopped or replaced

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::broadcast;

use crate::config::MonitorConfig;
use crate::journey::types::{ActiveJourney, JourneyId};
use crate::negotiation::RerouteNegotiator;
use crate::observability::metrics;
use crate::scheduler::TimerHandle;
use crate::traffic::{IntersectionId, TrafficSource};

const EVENT_CAPACITY: usize = 32;

/// Congestion reading for one intersection on the path.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub intersection: IntersectionId,
    pub congestion: f64,
}

/// Per-tick notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Readings for the whole path, in path order.
    Sampled {
        journey_id: JourneyId,
        samples: Vec<Sample>,
    },
    RerouteTriggered {
        journey_id: JourneyId,
        intersection: IntersectionId,
        congestion: f64,
    },
    /// The traffic query failed; the tick produced no data.
    QueryFailed { journey_id: JourneyId },
}

/// Polls traffic for the active journey.
#[derive(Clone)]
pub struct JourneyMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn TrafficSource>,
    config: MonitorConfig,
    negotiator: RerouteNegotiator,
    events_tx: broadcast::Sender<MonitorEvent>,
    active: Mutex<Option<ActiveRun>>,
    generation: AtomicU64,
}

struct ActiveRun {
    journey: Arc<ActiveJourney>,
    generation: u64,
    _ticker: TimerHandle,
}

impl JourneyMonitor {
    /// `config` should come from a validated `SyncConfig`; a zero poll
    /// interval is raised to 1 ms rather than rejected here.
    pub fn new(
        source: Arc<dyn TrafficSource>,
        config: MonitorConfig,
        negotiator: RerouteNegotiator,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                negotiator,
                events_tx,
                active: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Start monitoring `journey`, replacing any journey already monitored.
    ///
    /// The first tick happens one poll interval from now.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, journey: ActiveJourney) {
        let journey = Arc::new(journey);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let period = self.inner.config.poll_interval();

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let tick_journey = journey.clone();
        let ticker = TimerHandle::every(period, move || {
            if let Some(inner) = weak.upgrade() {
                let journey = tick_journey.clone();
                tokio::spawn(async move { inner.evaluate(journey, generation).await });
            }
        });

        let previous = self.inner.lock_active().replace(ActiveRun {
            journey: journey.clone(),
            generation,
            _ticker: ticker,
        });
        if let Some(previous) = previous {
            tracing::info!(
                journey_id = %previous.journey.journey_id,
                replaced_by = %journey.journey_id,
                "Journey replaced"
            );
        }
        tracing::info!(
            journey_id = %journey.journey_id,
            route_id = %journey.route_id,
            intersections = journey.path().len(),
            poll_ms = period.as_millis() as u64,
            "Journey monitoring started"
        );
    }

    /// Stop monitoring. Ticks still in flight are discarded.
    ///
    /// Returns the journey that was being monitored.
    pub fn stop(&self) -> Option<JourneyId> {
        let previous = self.inner.lock_active().take()?;
        // Bump so any in-flight tick sees a stale generation.
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        tracing::info!(journey_id = %previous.journey.journey_id, "Journey monitoring stopped");
        Some(previous.journey.journey_id)
    }

    pub fn current_journey(&self) -> Option<JourneyId> {
        self.inner
            .lock_active()
            .as_ref()
            .map(|run| run.journey.journey_id)
    }

    /// The journey being monitored.
    pub fn active_journey(&self) -> Option<Arc<ActiveJourney>> {
        self.inner
            .lock_active()
            .as_ref()
            .map(|run| run.journey.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.events_tx.subscribe()
    }
}

impl Inner {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|run| run.generation == generation)
    }

    async fn evaluate(&self, journey: Arc<ActiveJourney>, generation: u64) {
        let journey_id = journey.journey_id;
        let result = self.source.congestion(journey.path()).await;

        if !self.is_current(generation) {
            tracing::debug!(journey_id = %journey_id, "Discarding tick for inactive journey");
            return;
        }

        let readings = match result {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!(journey_id = %journey_id, error = %e, "Traffic query failed, skipping tick");
                metrics::record_query_failure();
                let _ = self.events_tx.send(MonitorEvent::QueryFailed { journey_id });
                return;
            }
        };

        let samples = sample_path(journey.path(), &readings);
        let breach = worst_breach(&samples, self.config.congestion_threshold).cloned();
        let _ = self.events_tx.send(MonitorEvent::Sampled {
            journey_id,
            samples,
        });

        let Some(breach) = breach else {
            return;
        };
        if self.negotiator.is_pending() {
            tracing::debug!(
                journey_id = %journey_id,
                intersection = %breach.intersection,
                "Congestion above threshold but a reroute is already pending"
            );
            return;
        }
        if self.negotiator.trigger(journey_id) {
            tracing::info!(
                journey_id = %journey_id,
                intersection = %breach.intersection,
                congestion = breach.congestion,
                threshold = self.config.congestion_threshold,
                "Heavy traffic on route, reroute triggered"
            );
            metrics::record_reroute_trigger();
            let _ = self.events_tx.send(MonitorEvent::RerouteTriggered {
                journey_id,
                intersection: breach.intersection,
                congestion: breach.congestion,
            });
        }
    }
}

/// Readings in path order; intersections without data read as 0%.
fn sample_path(path: &[IntersectionId], readings: &HashMap<IntersectionId, f64>) -> Vec<Sample> {
    path.iter()
        .map(|id| Sample {
            intersection: id.clone(),
            congestion: readings.get(id).copied().unwrap_or(0.0),
        })
        .collect()
}

/// The most congested sample at or above `threshold`. Ties keep the earliest.
fn worst_breach(samples: &[Sample], threshold: f64) -> Option<&Sample> {
    samples
        .iter()
        .filter(|s| s.congestion >= threshold)
        .fold(None, |worst: Option<&Sample>, s| match worst {
            Some(w) if w.congestion >= s.congestion => Some(w),
            _ => Some(s),
        })
}
