//! Reroute negotiation.
//!
//! # Lifecycle
//! ```text
//! trigger(journey)  → Pending, deadline armed, NegotiationEvent::Opened
//! respond(true)     → Accepted  → RerouteAccepted to journey control
//! respond(false)    → Declined  → journey continues
//! deadline          → TimedOut  → journey continues, passive notice
//! ```
//!
//! Exactly one terminal outcome per request. Whichever of answer and
//! deadline lands first wins; the other is a no-op.

pub mod negotiator;
pub mod sink;
pub mod types;

pub use negotiator::RerouteNegotiator;
pub use sink::DecisionSink;
pub use types::{
    NegotiationError, NegotiationEvent, NegotiationId, NegotiationRequest, Outcome,
    RerouteAccepted,
};
