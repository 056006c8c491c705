//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → store → API client → negotiator → monitor → stream connect
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop journey → close transport (no reconnect) → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{ShutdownListener, ShutdownSignal};
pub use signals::wait_for_signal;
pub use startup::{StartupError, SyncRuntime};
