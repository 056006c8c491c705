//! Streaming connection manager.
//!
//! # Responsibilities
//! - Own exactly one WebSocket transport at a time
//! - Send heartbeats while open
//! - Dispatch inbound messages into the traffic store in arrival order
//! - Detect failure and reconnect after the configured delay
//! - Close cleanly on shutdown without reconnecting

use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::StreamConfig;
use crate::lifecycle::{ShutdownListener, ShutdownSignal};
use crate::observability::metrics;
use crate::resilience::ReconnectPolicy;
use crate::stream::connection::{ConnectionState, TransportId, TransportTracker};
use crate::stream::envelope::{parse_inbound, Inbound, Outbound};
use crate::stream::error::{EnvelopeError, StreamError};
use crate::traffic::TrafficStateStore;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_CAPACITY: usize = 64;

/// Connectivity notifications for presentation collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A transport finished its handshake.
    Connected { transport: TransportId },
    /// A transport (or a connection attempt) ended.
    Disconnected { transport: TransportId, reason: String },
    /// The single reconnect attempt for the last drop will start after this delay.
    ReconnectScheduled { after: Duration },
}

/// How one transport cycle ended.
enum CycleExit {
    Shutdown,
    Failed {
        transport: TransportId,
        error: StreamError,
        was_open: bool,
    },
}

enum SupervisorSlot {
    Idle(mpsc::Receiver<()>),
    Running(JoinHandle<()>),
}

/// Keeps the traffic stream connected.
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: StreamConfig,
    policy: ReconnectPolicy,
    store: TrafficStateStore,
    shutdown: ShutdownSignal,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<ConnectionEvent>,
    transports: TransportTracker,
    wake_tx: mpsc::Sender<()>,
    supervisor: Mutex<Option<SupervisorSlot>>,
}

impl ConnectionManager {
    /// `config` should come from a validated `SyncConfig`; a zero heartbeat
    /// interval is raised to 1 ms rather than rejected here.
    pub fn new(config: StreamConfig, store: TrafficStateStore, shutdown: ShutdownSignal) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (wake_tx, wake_rx) = mpsc::channel(1);
        let policy = ReconnectPolicy::from_config(&config.reconnect);

        Self {
            inner: Arc::new(Inner {
                config,
                policy,
                store,
                shutdown,
                state_tx,
                events_tx,
                transports: TransportTracker::new(),
                wake_tx,
                supervisor: Mutex::new(Some(SupervisorSlot::Idle(wake_rx))),
            }),
        }
    }

    /// Start connecting.
    ///
    /// No-op while `Connecting` or `Open`. While waiting out a reconnect
    /// delay, the pending attempt starts immediately instead.
    pub fn connect(&self) {
        let state = self.state();
        if matches!(state, ConnectionState::Connecting | ConnectionState::Open) {
            tracing::debug!(%state, "connect() ignored, already active");
            return;
        }
        if self.inner.shutdown.is_triggered() {
            tracing::warn!("connect() after shutdown ignored");
            return;
        }

        let mut slot = match self.inner.supervisor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match slot.take() {
            Some(SupervisorSlot::Idle(wake_rx)) => {
                self.inner.set_state(ConnectionState::Connecting);
                let inner = Arc::clone(&self.inner);
                let handle = tokio::spawn(async move { inner.supervise(wake_rx).await });
                *slot = Some(SupervisorSlot::Running(handle));
            }
            Some(SupervisorSlot::Running(handle)) => {
                if !handle.is_finished() && self.state() == ConnectionState::Closed {
                    self.inner.set_state(ConnectionState::Connecting);
                    let _ = self.inner.wake_tx.try_send(());
                }
                *slot = Some(SupervisorSlot::Running(handle));
            }
            None => {}
        }
    }

    /// Trigger shutdown and wait for the active transport to close.
    ///
    /// No reconnect is scheduled afterwards.
    pub async fn shutdown(&self) {
        self.inner.shutdown.trigger();

        let handle = {
            let mut slot = match self.inner.supervisor.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match slot.take() {
                Some(SupervisorSlot::Running(handle)) => Some(handle),
                _ => None,
            }
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Stream supervisor task failed");
            }
        }
        self.inner.set_state(ConnectionState::Closed);
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_usable()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Receive connectivity events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Number of transports currently alive (0 or 1).
    pub fn active_transports(&self) -> usize {
        self.inner.transports.active_count()
    }

    /// Most transports ever alive at the same time.
    pub fn peak_transports(&self) -> usize {
        self.inner.transports.peak_count()
    }

    pub fn store(&self) -> &TrafficStateStore {
        &self.inner.store
    }

    /// Handle one inbound text frame.
    pub fn dispatch_text(&self, transport: TransportId, text: &str) {
        self.inner.dispatch_text(transport, text);
    }
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Connection state changed");
            metrics::record_connection_state(state.as_gauge());
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    async fn supervise(self: Arc<Self>, mut wake_rx: mpsc::Receiver<()>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut attempt: u32 = 0;

        tracing::info!(url = %self.config.url, "Stream supervisor starting");

        loop {
            if shutdown.is_triggered() {
                break;
            }
            self.set_state(ConnectionState::Connecting);

            let (transport, error, was_open) = match self.run_cycle(&mut shutdown).await {
                CycleExit::Shutdown => break,
                CycleExit::Failed {
                    transport,
                    error,
                    was_open,
                } => (transport, error, was_open),
            };

            if was_open {
                attempt = 0;
            }
            attempt = attempt.saturating_add(1);

            // Requests made before this drop must not shorten the coming delay.
            while wake_rx.try_recv().is_ok() {}

            self.set_state(ConnectionState::Closed);
            tracing::warn!(transport = %transport, error = %error, "Stream disconnected");
            self.emit(ConnectionEvent::Disconnected {
                transport,
                reason: error.to_string(),
            });

            let delay = self.policy.delay_for(attempt);
            tracing::info!(delay_ms = delay.as_millis() as u64, attempt, "Reconnect scheduled");
            metrics::record_reconnect();
            self.emit(ConnectionEvent::ReconnectScheduled { after: delay });

            tokio::select! {
                _ = time::sleep(delay) => {}
                Some(()) = wake_rx.recv() => {
                    tracing::debug!("Reconnect requested early");
                }
                _ = shutdown.recv() => break,
            }
        }

        self.set_state(ConnectionState::Closed);
        tracing::info!("Stream supervisor stopped");
    }

    /// Open one transport and run it until it fails or shutdown is requested.
    async fn run_cycle(&self, shutdown: &mut ShutdownListener) -> CycleExit {
        let transport = TransportId::new();
        tracing::debug!(transport = %transport, url = %self.config.url, "Connecting");

        let handshake = time::timeout(self.config.connect_timeout(), connect_async(self.config.url.as_str()));
        let ws = tokio::select! {
            result = handshake => match result {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => return CycleExit::Failed {
                    transport,
                    error: StreamError::Connect(e),
                    was_open: false,
                },
                Err(_) => return CycleExit::Failed {
                    transport,
                    error: StreamError::HandshakeTimeout(self.config.connect_timeout_ms),
                    was_open: false,
                },
            },
            _ = shutdown.recv() => return CycleExit::Shutdown,
        };

        let _guard = self.transports.track(transport);
        self.set_state(ConnectionState::Open);
        tracing::info!(transport = %transport, "Stream connected");
        self.emit(ConnectionEvent::Connected { transport });

        match self.drive(transport, ws, shutdown).await {
            Ok(()) => CycleExit::Shutdown,
            Err(error) => CycleExit::Failed {
                transport,
                error,
                was_open: true,
            },
        }
        // `_guard` drops here, after reader and writer are gone.
    }

    /// Pump an open transport. `Ok(())` means a clean shutdown.
    async fn drive(
        &self,
        transport: TransportId,
        ws: WsStream,
        shutdown: &mut ShutdownListener,
    ) -> Result<(), StreamError> {
        let (mut sink, mut stream) = ws.split();

        let heartbeat_every = self.config.heartbeat_interval();
        let mut heartbeat = time::interval_at(Instant::now() + heartbeat_every, heartbeat_every);
        let liveness = self.config.liveness_timeout();
        let mut last_seen = Instant::now();

        loop {
            let idle_deadline = liveness.map(|limit| last_seen + limit);
            let idle = async move {
                match idle_deadline {
                    Some(deadline) => time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                frame = stream.next() => {
                    let message = match frame {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => return Err(StreamError::Transport(e)),
                        None => return Err(StreamError::RemoteClosed { code: None }),
                    };
                    last_seen = Instant::now();

                    match message {
                        Message::Text(text) => self.dispatch_text(transport, text.as_str()),
                        Message::Binary(_) => self.drop_message(transport, &EnvelopeError::Binary),
                        Message::Close(frame) => {
                            return Err(StreamError::RemoteClosed {
                                code: frame.map(|f| u16::from(f.code)),
                            });
                        }
                        // Protocol-level ping/pong: liveness only.
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                    }
                }
                _ = heartbeat.tick() => {
                    match Outbound::Ping.encode() {
                        Ok(ping) => {
                            tracing::trace!(transport = %transport, "Sending heartbeat");
                            sink.send(Message::text(ping)).await.map_err(StreamError::Transport)?;
                        }
                        Err(e) => tracing::error!(error = %e, "Failed to encode heartbeat"),
                    }
                }
                _ = idle => {
                    let limit = liveness.map(|d| d.as_millis() as u64).unwrap_or_default();
                    return Err(StreamError::LivenessTimeout(limit));
                }
                _ = shutdown.recv() => {
                    self.set_state(ConnectionState::Closing);
                    tracing::info!(transport = %transport, "Closing stream for shutdown");
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        tracing::debug!(transport = %transport, error = %e, "Close frame not delivered");
                    }
                    let _ = sink.close().await;
                    return Ok(());
                }
            }
        }
    }

    fn dispatch_text(&self, transport: TransportId, text: &str) {
        match parse_inbound(text) {
            Ok(Inbound::TrafficUpdate(update)) => {
                for (key, reason) in &update.rejected {
                    tracing::warn!(
                        transport = %transport,
                        intersection = %key,
                        reason = %reason,
                        "Skipping malformed traffic entry"
                    );
                }
                let applied = self.store.merge_all(update.entries);
                metrics::record_message("traffic_update");
                tracing::debug!(transport = %transport, applied, "Traffic update merged");
            }
            Ok(inbound) => {
                metrics::record_message(inbound.kind());
                tracing::trace!(transport = %transport, kind = inbound.kind(), "Keep-alive received");
            }
            Err(e) => self.drop_message(transport, &e),
        }
    }

    fn drop_message(&self, transport: TransportId, error: &EnvelopeError) {
        metrics::record_dropped_message(error.reason());
        tracing::warn!(transport = %transport, error = %error, "Dropping inbound message");
    }
}
