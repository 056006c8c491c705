//! Connection state and transport tracking.
//!
//! # Responsibilities
//! - Name the states of the streaming connection
//! - Give every transport instance a unique id for tracing
//! - Count live transports so overlap can be detected

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Global counter for transport IDs.
/// Relaxed ordering is enough; only uniqueness matters.
static TRANSPORT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one transport instance (one WebSocket connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(u64);

impl TransportId {
    /// Generate a new unique transport ID.
    pub fn new() -> Self {
        Self(TRANSPORT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransportId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transport-{}", self.0)
    }
}

/// Streaming connection state.
///
/// # State Transitions
/// ```text
/// Closed → Connecting: connect() or reconnect delay elapsed
/// Connecting → Open: handshake succeeded
/// Connecting → Closed: handshake failed or timed out
/// Open → Closed: remote close, transport error, liveness timeout (when enabled)
/// Open → Closing → Closed: shutdown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    /// True only while messages can flow.
    pub fn is_usable(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Numeric encoding for the state gauge.
    pub fn as_gauge(&self) -> f64 {
        match self {
            ConnectionState::Closed => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Open => 2.0,
            ConnectionState::Closing => 3.0,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Counts live transports.
#[derive(Debug, Clone, Default)]
pub struct TransportTracker {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl TransportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live transport. Returns a guard that decrements on drop.
    pub fn track(&self, id: TransportId) -> TransportGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        TransportGuard {
            active: Arc::clone(&self.active),
            id,
        }
    }

    /// Transports currently live.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live transports ever seen.
    pub fn peak_count(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a transport's lifetime.
#[derive(Debug)]
pub struct TransportGuard {
    active: Arc<AtomicUsize>,
    id: TransportId,
}

impl TransportGuard {
    pub fn id(&self) -> TransportId {
        self.id
    }
}

impl Drop for TransportGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(transport = %self.id, "Transport released");
    }
}
