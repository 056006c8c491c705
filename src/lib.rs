//! Real-time traffic sync layer.
//!
//! Keeps a local view of intersection traffic current over a WebSocket
//! stream, watches the active journey for congestion, and negotiates
//! reroutes with the user inside a short decision window.
//!
//! ```text
//!   traffic server ──ws──▶ stream::ConnectionManager ──merge──▶ traffic::TrafficStateStore
//!                                                                      │ read
//!                                                                      ▼
//!   journey control ──start/stop──▶ journey::JourneyMonitor ──trigger──▶ negotiation::RerouteNegotiator
//!          ▲                                                                   │
//!          └──────────────────────── RerouteAccepted ◀─────────────────────────┘
//! ```

// Core subsystems
pub mod journey;
pub mod negotiation;
pub mod stream;
pub mod traffic;

// Collaborators
pub mod api;
pub mod scheduler;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::SyncConfig;
pub use lifecycle::{ShutdownSignal, SyncRuntime};
