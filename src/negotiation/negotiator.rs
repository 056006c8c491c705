//! Reroute negotiator.
//!
//! # Responsibilities
//! - Open at most one decision window at a time
//! - Resolve it exactly once: user answer or deadline, whichever comes first
//! - Tell journey control about accepts; tell the presentation layer about everything
//! - Report the answer to the server, best-effort

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{broadcast, mpsc};

use crate::config::NegotiationConfig;
use crate::journey::JourneyId;
use crate::negotiation::sink::DecisionSink;
use crate::negotiation::types::{
    NegotiationEvent, NegotiationId, NegotiationRequest, Outcome, RerouteAccepted,
};
use crate::observability::metrics;
use crate::scheduler::TimerHandle;

const EVENT_CAPACITY: usize = 32;

/// Negotiates reroutes with the user.
///
/// Cheap to clone; clones share the same pending request.
#[derive(Clone)]
pub struct RerouteNegotiator {
    inner: Arc<Inner>,
}

struct Inner {
    config: NegotiationConfig,
    pending: Mutex<Option<OpenRequest>>,
    events_tx: broadcast::Sender<NegotiationEvent>,
    accept_tx: mpsc::UnboundedSender<RerouteAccepted>,
    accept_rx: Mutex<Option<mpsc::UnboundedReceiver<RerouteAccepted>>>,
    sink: Option<Arc<dyn DecisionSink>>,
}

struct OpenRequest {
    request: NegotiationRequest,
    // Dropping the request cancels its deadline.
    _deadline: TimerHandle,
}

impl RerouteNegotiator {
    pub fn new(config: NegotiationConfig, sink: Option<Arc<dyn DecisionSink>>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                config,
                pending: Mutex::new(None),
                events_tx,
                accept_tx,
                accept_rx: Mutex::new(Some(accept_rx)),
                sink,
            }),
        }
    }

    /// Open a decision window for `journey_id`.
    ///
    /// Returns `false` and does nothing if any window is already open.
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self, journey_id: JourneyId) -> bool {
        let mut pending = self.inner.lock_pending();
        if let Some(open) = pending.as_ref() {
            tracing::debug!(
                journey_id = %journey_id,
                pending_journey = %open.request.journey_id,
                "Reroute already under negotiation, trigger ignored"
            );
            return false;
        }

        let window = self.inner.config.decision_window();
        let request = NegotiationRequest::open(journey_id, window);
        let id = request.id;
        let event = NegotiationEvent::Opened {
            id,
            journey_id,
            deadline: request.deadline,
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let deadline = TimerHandle::after(window, move || {
            if let Some(inner) = weak.upgrade() {
                inner.finish(Some(id), Outcome::TimedOut);
            }
        });

        *pending = Some(OpenRequest {
            request,
            _deadline: deadline,
        });
        drop(pending);

        tracing::info!(
            journey_id = %journey_id,
            negotiation = %id,
            window_ms = window.as_millis() as u64,
            "Reroute offered"
        );
        let _ = self.inner.events_tx.send(event);
        true
    }

    /// Record the user's answer.
    ///
    /// Returns the outcome, or `None` if no window was open (already answered
    /// or timed out).
    pub fn respond(&self, accept: bool) -> Option<Outcome> {
        let outcome = if accept {
            Outcome::Accepted
        } else {
            Outcome::Declined
        };
        self.inner.finish(None, outcome)
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock_pending().is_some()
    }

    /// Journey of the open window, if any.
    pub fn pending_journey(&self) -> Option<JourneyId> {
        self.inner
            .lock_pending()
            .as_ref()
            .map(|open| open.request.journey_id)
    }

    /// Open/close notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<NegotiationEvent> {
        self.inner.events_tx.subscribe()
    }

    /// The journey-control channel. Can be taken once.
    pub fn take_accept_receiver(&self) -> Option<mpsc::UnboundedReceiver<RerouteAccepted>> {
        match self.inner.accept_rx.lock() {
            Ok(mut rx) => rx.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, Option<OpenRequest>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Resolve the open window. With `expected`, only that window is resolved
    /// (a late deadline must not close a newer one).
    fn finish(&self, expected: Option<NegotiationId>, outcome: Outcome) -> Option<Outcome> {
        let mut open = {
            let mut pending = self.lock_pending();
            match (pending.as_ref(), expected) {
                (None, _) => return None,
                (Some(open), Some(id)) if open.request.id != id => return None,
                _ => {}
            }
            pending.take()?
        };

        if let Err(e) = open.request.resolve(outcome) {
            tracing::debug!(error = %e, "Negotiation already resolved");
            return None;
        }

        let journey_id = open.request.journey_id;
        let id = open.request.id;
        tracing::info!(
            journey_id = %journey_id,
            negotiation = %id,
            outcome = %outcome,
            "Reroute negotiation resolved"
        );
        metrics::record_negotiation(outcome.as_str());

        if outcome == Outcome::Accepted {
            let accepted = RerouteAccepted {
                journey_id,
                negotiation: id,
            };
            if self.accept_tx.send(accepted).is_err() {
                tracing::warn!(journey_id = %journey_id, "Journey control is gone, accept not delivered");
            }
        }

        let _ = self.events_tx.send(NegotiationEvent::Closed {
            id,
            journey_id,
            outcome,
        });

        self.submit(journey_id, outcome);

        // `open` drops last; on the deadline path that aborts the running
        // timer task, which has nothing left to do.
        drop(open);
        Some(outcome)
    }

    fn submit(&self, journey_id: JourneyId, outcome: Outcome) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let accept = match outcome {
            Outcome::Accepted => true,
            Outcome::Declined => false,
            Outcome::TimedOut if self.config.notify_server_on_timeout => false,
            Outcome::TimedOut | Outcome::Pending => return,
        };
        if !self.config.submit_decisions {
            return;
        }

        tokio::spawn(async move {
            match sink.submit(journey_id, accept).await {
                Ok(()) => tracing::debug!(journey_id = %journey_id, accept, "Route-change decision acknowledged"),
                Err(e) => tracing::warn!(
                    journey_id = %journey_id,
                    accept,
                    error = %e,
                    "Failed to submit route-change decision; local outcome stands"
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(JourneyId, bool)>>,
        fail: bool,
    }

    #[async_trait]
    impl DecisionSink for RecordingSink {
        async fn submit(&self, journey_id: JourneyId, accept: bool) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push((journey_id, accept));
            if self.fail {
                Err(ApiError::Rejected("no pending route change".into()))
            } else {
                Ok(())
            }
        }
    }

    fn config(window_ms: u64) -> NegotiationConfig {
        NegotiationConfig {
            decision_window_ms: window_ms,
            ..Default::default()
        }
    }

    async fn next_closed(events: &mut broadcast::Receiver<NegotiationEvent>) -> Outcome {
        loop {
            match timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap() {
                NegotiationEvent::Closed { outcome, .. } => return outcome,
                NegotiationEvent::Opened { .. } => continue,
            }
        }
    }

    #[tokio::test]
    async fn accept_within_window() {
        let negotiator = RerouteNegotiator::new(config(3_000), None);
        let mut accepts = negotiator.take_accept_receiver().unwrap();
        let mut events = negotiator.subscribe();

        assert!(negotiator.trigger(JourneyId(7)));
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(negotiator.respond(true), Some(Outcome::Accepted));

        assert_eq!(next_closed(&mut events).await, Outcome::Accepted);
        let accepted = accepts.recv().await.unwrap();
        assert_eq!(accepted.journey_id, JourneyId(7));

        // The cancelled deadline must not produce a second outcome.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(events.try_recv().is_err());
        assert!(accepts.try_recv().is_err());
        assert!(!negotiator.is_pending());
    }

    #[tokio::test]
    async fn no_answer_times_out() {
        let negotiator = RerouteNegotiator::new(config(3_000), None);
        let mut accepts = negotiator.take_accept_receiver().unwrap();
        let mut events = negotiator.subscribe();

        assert!(negotiator.trigger(JourneyId(2)));
        let outcome = timeout(Duration::from_secs(4), next_closed(&mut events)).await.unwrap();
        assert_eq!(outcome, Outcome::TimedOut);
        assert!(events.try_recv().is_err());
        assert!(accepts.try_recv().is_err());

        // A late click is a no-op.
        assert_eq!(negotiator.respond(true), None);
        assert!(accepts.try_recv().is_err());
    }

    #[tokio::test]
    async fn respond_twice_is_noop() {
        let negotiator = RerouteNegotiator::new(config(1_000), None);
        let mut events = negotiator.subscribe();

        negotiator.trigger(JourneyId(3));
        assert_eq!(negotiator.respond(false), Some(Outcome::Declined));
        assert_eq!(negotiator.respond(true), None);
        assert_eq!(negotiator.respond(false), None);

        assert_eq!(next_closed(&mut events).await, Outcome::Declined);
        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn respond_without_window_is_noop() {
        let negotiator = RerouteNegotiator::new(config(1_000), None);
        assert_eq!(negotiator.respond(true), None);
        assert!(negotiator.pending_journey().is_none());
    }

    #[tokio::test]
    async fn overlapping_trigger_ignored() {
        let negotiator = RerouteNegotiator::new(config(500), None);

        assert!(negotiator.trigger(JourneyId(1)));
        assert!(!negotiator.trigger(JourneyId(1)));
        assert!(!negotiator.trigger(JourneyId(2)));
        assert_eq!(negotiator.pending_journey(), Some(JourneyId(1)));

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(!negotiator.is_pending());
        assert!(negotiator.trigger(JourneyId(2)));
    }

    #[tokio::test]
    async fn decisions_submitted_but_not_timeouts() {
        let sink = Arc::new(RecordingSink::default());
        let negotiator = RerouteNegotiator::new(config(100), Some(sink.clone() as Arc<dyn DecisionSink>));

        negotiator.trigger(JourneyId(5));
        negotiator.respond(true);
        negotiator.trigger(JourneyId(6));
        negotiator.respond(false);
        negotiator.trigger(JourneyId(8));
        tokio::time::sleep(Duration::from_millis(300)).await;

        let calls = sink.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(JourneyId(5), true), (JourneyId(6), false)]);
    }

    #[tokio::test]
    async fn timeout_notifies_server_when_configured() {
        let sink = Arc::new(RecordingSink::default());
        let config = NegotiationConfig {
            decision_window_ms: 50,
            notify_server_on_timeout: true,
            ..Default::default()
        };
        let negotiator = RerouteNegotiator::new(config, Some(sink.clone() as Arc<dyn DecisionSink>));

        negotiator.trigger(JourneyId(9));
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(sink.calls.lock().unwrap().clone(), vec![(JourneyId(9), false)]);
    }

    #[tokio::test]
    async fn failed_submission_keeps_local_outcome() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let negotiator = RerouteNegotiator::new(config(1_000), Some(sink.clone() as Arc<dyn DecisionSink>));
        let mut accepts = negotiator.take_accept_receiver().unwrap();

        negotiator.trigger(JourneyId(11));
        assert_eq!(negotiator.respond(true), Some(Outcome::Accepted));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(sink.calls.lock().unwrap().len(), 1);
        assert_eq!(accepts.try_recv().unwrap().journey_id, JourneyId(11));
        assert!(negotiator.take_accept_receiver().is_none());
    }
}
