//! Shared utilities for integration tests.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;

use traffic_sync::config::{ReconnectConfig, ReconnectStrategy, StreamConfig};
use traffic_sync::stream::ConnectionState;

/// Instruction for every live mock connection.
#[derive(Debug, Clone)]
pub enum Command {
    Send(String),
    /// Drop the TCP connection without a close frame.
    Drop,
}

#[derive(Default)]
struct Stats {
    connections: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    accepted_at: Mutex<Vec<Instant>>,
    received: Mutex<Vec<String>>,
}

/// A WebSocket server that records what clients do.
pub struct MockStreamServer {
    pub addr: SocketAddr,
    stats: Arc<Stats>,
    commands: broadcast::Sender<Command>,
}

impl MockStreamServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(Stats::default());
        let (commands, _) = broadcast::channel(64);

        let accept_stats = stats.clone();
        let accept_commands = commands.clone();
        tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let stats = accept_stats.clone();
                let mut commands = accept_commands.subscribe();
                tokio::spawn(async move {
                    let mut ws = match tokio_tungstenite::accept_async(socket).await {
                        Ok(ws) => ws,
                        Err(_) => return,
                    };
                    stats.connections.fetch_add(1, Ordering::SeqCst);
                    stats.accepted_at.lock().unwrap().push(Instant::now());
                    let live = stats.live.fetch_add(1, Ordering::SeqCst) + 1;
                    stats.max_live.fetch_max(live, Ordering::SeqCst);

                    loop {
                        tokio::select! {
                            cmd = commands.recv() => match cmd {
                                Ok(Command::Send(text)) => {
                                    if ws.send(Message::text(text)).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(Command::Drop) | Err(_) => break,
                            },
                            msg = ws.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    stats.received.lock().unwrap().push(text.as_str().to_string());
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                        }
                    }
                    stats.live.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            stats,
            commands,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn send(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::Send(text.into()));
    }

    pub fn drop_connections(&self) {
        let _ = self.commands.send(Command::Drop);
    }

    pub fn connections(&self) -> usize {
        self.stats.connections.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.stats.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.stats.max_live.load(Ordering::SeqCst)
    }

    pub fn accepted_at(&self) -> Vec<Instant> {
        self.stats.accepted_at.lock().unwrap().clone()
    }

    pub fn received(&self) -> Vec<String> {
        self.stats.received.lock().unwrap().clone()
    }

    /// Wait until `n` connections have been accepted in total.
    pub async fn wait_for_connections(&self, n: usize, within: Duration) {
        let deadline = Instant::now() + within;
        while self.connections() < n {
            assert!(
                Instant::now() < deadline,
                "expected {} connections, saw {}",
                n,
                self.connections()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Stream config with test-sized timings and a fixed reconnect delay.
pub fn stream_config(url: String, reconnect_ms: u64, heartbeat_ms: u64) -> StreamConfig {
    StreamConfig {
        url,
        connect_timeout_ms: 2_000,
        heartbeat_interval_ms: heartbeat_ms,
        liveness_timeout_ms: 0,
        reconnect: ReconnectConfig {
            strategy: ReconnectStrategy::Fixed,
            delay_ms: reconnect_ms,
            max_delay_ms: reconnect_ms,
        },
    }
}

pub async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    state: ConnectionState,
    within: Duration,
) {
    tokio::time::timeout(within, rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", state))
        .unwrap();
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually<F: Fn() -> bool>(within: Duration, check: F) -> bool {
    let deadline = Instant::now() + within;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// One request as seen by the programmable backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request_line: String,
    pub body: String,
}

/// Start an HTTP backend that answers every request with `f(request)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<Mutex<Vec<RecordedRequest>>>)
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        recorded.lock().unwrap().push(request.clone());
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, requests)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[head_end..]).to_string(),
    })
}
