//! Negotiation request types.

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::journey::JourneyId;

/// Unique id of one negotiation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NegotiationId(Uuid);

impl NegotiationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NegotiationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NegotiationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Accepted,
    Declined,
    TimedOut,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Accepted => "accepted",
            Outcome::Declined => "declined",
            Outcome::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("negotiation {id} already resolved as {outcome}")]
    AlreadyResolved { id: NegotiationId, outcome: Outcome },

    #[error("pending is not a resolution")]
    NotTerminal,
}

/// One reroute decision window.
#[derive(Debug, Clone)]
pub struct NegotiationRequest {
    pub id: NegotiationId,
    pub journey_id: JourneyId,
    pub deadline: Instant,
    outcome: Outcome,
}

impl NegotiationRequest {
    /// Open a request whose window closes `window` from now.
    pub fn open(journey_id: JourneyId, window: Duration) -> Self {
        Self {
            id: NegotiationId::new(),
            journey_id,
            deadline: Instant::now() + window,
            outcome: Outcome::Pending,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_pending(&self) -> bool {
        self.outcome == Outcome::Pending
    }

    /// Record the outcome. Write-once.
    pub fn resolve(&mut self, outcome: Outcome) -> Result<(), NegotiationError> {
        if !outcome.is_terminal() {
            return Err(NegotiationError::NotTerminal);
        }
        if self.outcome.is_terminal() {
            return Err(NegotiationError::AlreadyResolved {
                id: self.id,
                outcome: self.outcome,
            });
        }
        self.outcome = outcome;
        Ok(())
    }
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationEvent {
    /// Ask the user; the window closes at `deadline`.
    Opened {
        id: NegotiationId,
        journey_id: JourneyId,
        deadline: Instant,
    },
    /// The window closed. `TimedOut` is the passive notice.
    Closed {
        id: NegotiationId,
        journey_id: JourneyId,
        outcome: Outcome,
    },
}

/// Sent to journey control when the user accepts a reroute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerouteAccepted {
    pub journey_id: JourneyId,
    pub negotiation: NegotiationId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_is_write_once() {
        let mut request = NegotiationRequest::open(JourneyId(1), Duration::from_secs(3));
        assert!(request.is_pending());
        assert!(request.deadline <= Instant::now() + Duration::from_secs(3));

        request.resolve(Outcome::Declined).unwrap();
        let err = request.resolve(Outcome::Accepted).unwrap_err();
        assert_eq!(
            err,
            NegotiationError::AlreadyResolved {
                id: request.id,
                outcome: Outcome::Declined
            }
        );
        assert_eq!(request.outcome(), Outcome::Declined);
    }

    #[tokio::test]
    async fn pending_is_not_a_resolution() {
        let mut request = NegotiationRequest::open(JourneyId(1), Duration::from_secs(3));
        assert_eq!(request.resolve(Outcome::Pending), Err(NegotiationError::NotTerminal));
        assert!(request.is_pending());
    }
}
