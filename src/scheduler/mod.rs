//! Cancellable timers.
//!
//! # Data Flow
//! ```text
//! journey::monitor    → TimerHandle::every (poll ticks)
//! negotiation         → TimerHandle::after (decision deadline)
//!
//! owner drops or cancels the handle
//!     → underlying task aborted, no further callbacks
//! ```
//!
//! # Design Decisions
//! - A timer is owned by exactly one handle; dropping the handle cancels it
//! - Callbacks are synchronous; long work is spawned by the caller so that
//!   cancelling a timer never tears down work already in flight

pub mod timer;

pub use timer::TimerHandle;
