//! Active journey monitoring.
//!
//! # Data Flow
//! ```text
//! control.rs: start(ActiveJourney)
//!     → monitor.rs ticker (every poll interval)
//!     → traffic::TrafficSource query for the path
//!     → generation check (stale ticks dropped)
//!     → threshold check → negotiation::RerouteNegotiator::trigger
//!
//! accepted reroute → control.rs
//!     → stop old journey → plan via api::ApiClient → start new journey
//!     (planning failure restarts the old journey)
//! ```

pub mod control;
pub mod monitor;
pub mod types;

pub use control::{plan_journey, JourneyControl, PlanError};
pub use monitor::{JourneyMonitor, MonitorEvent, Sample};
pub use types::{ActiveJourney, JourneyError, JourneyId, RouteId};
