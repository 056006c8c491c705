//! Streaming connection subsystem.
//!
//! # Data Flow
//! ```text
//! connect()
//!     → manager.rs supervisor task (one per process)
//!     → WebSocket handshake (tokio-tungstenite)
//!     → frames → envelope.rs (parse_inbound)
//!     → traffic::TrafficStateStore (merge, arrival order)
//!
//! transport failure:
//!     → state Closed, ConnectionEvent::Disconnected
//!     → resilience::ReconnectPolicy delay
//!     → fresh transport (old one already dropped)
//! ```
//!
//! # Design Decisions
//! - A single supervisor loop owns the transport, so two can never overlap
//! - Heartbeat timer lives inside the per-transport loop and dies with it
//! - Malformed messages are dropped; only transport failures close the stream
//! - Shutdown closes the transport and never schedules a reconnect

pub mod connection;
pub mod envelope;
pub mod error;
pub mod manager;

pub use connection::{ConnectionState, TransportId};
pub use envelope::{parse_inbound, Inbound, Outbound, TrafficUpdate};
pub use error::{EnvelopeError, StreamError};
pub use manager::{ConnectionEvent, ConnectionManager};
