//! REST client for the traffic server.
//!
//! Used for route computation, journey registration and route-change
//! acknowledgements, and as a pull-based traffic source for the monitor.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{
    Health, IntersectionInfo, JourneyRecord, JourneyStarted, RouteChangeResponse, RouteResult,
    TrafficTable,
};
