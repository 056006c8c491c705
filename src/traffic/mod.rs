//! Traffic state subsystem.
//!
//! # Data Flow
//! ```text
//! stream::manager (inbound traffic_update)
//!     → types.rs (SnapshotUpdate decoded per intersection)
//!     → store.rs (merged into the shared TrafficStateStore)
//!
//! journey::monitor (each poll tick)
//!     → source.rs (TrafficSource::congestion for the active path)
//!     → store.rs or api::ApiClient (push-fed or pull-based readings)
//! ```
//!
//! # Design Decisions
//! - One store per process, cloned by handle (Arc inside)
//! - Only the connection manager writes snapshot data; everyone else reads
//! - Missing intersections read as 0% congestion, never as an error

pub mod source;
pub mod store;
pub mod types;

pub use source::{QueryError, TrafficSource};
pub use store::TrafficStateStore;
pub use types::{CongestionStatus, IntersectionId, SnapshotUpdate, TrafficSnapshot};
