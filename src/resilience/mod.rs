//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! stream transport drops
//!     → backoff.rs (ReconnectPolicy::delay_for)
//!     → supervisor sleeps, then opens a fresh transport
//! ```
//!
//! # Design Decisions
//! - Fixed delay by default; the stream server expects steady 5s retries
//! - Exponential with jitter available for fleets of clients
//! - Transport failures are never fatal

pub mod backoff;

pub use backoff::ReconnectPolicy;
