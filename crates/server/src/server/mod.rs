//! Sync server implementation.
//!
//! Owns the listener loop, per-connection handler tasks, and the
//! broadcast fan-out that carries pre-encoded frames to every
//! connection.

use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use protocol::ServerMessage;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

pub mod game;
pub mod session;

pub use game::GameState;

/// Delivery target for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connected session.
    All,
    /// Every session except one (skip the originator).
    AllExcept(u32),
    /// One session only (welcome, snapshot, pong).
    Client(u32),
}

impl Recipient {
    /// Whether a frame addressed this way should reach `client_id`.
    pub fn includes(&self, client_id: u32) -> bool {
        match *self {
            Recipient::All => true,
            Recipient::AllExcept(excluded) => excluded != client_id,
            Recipient::Client(target) => target == client_id,
        }
    }
}

/// A message queued while the state lock was held, delivered after
/// it is released.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn to(recipient: Recipient, message: ServerMessage) -> Self {
        Self { recipient, message }
    }
}

/// One pre-encoded wire frame on the fan-out channel.
#[derive(Debug, Clone)]
pub struct Frame {
    pub recipient: Recipient,
    pub data: Arc<str>,
}

/// Best-effort fan-out to all connection tasks.
///
/// Each message is JSON-encoded exactly once; every connection task
/// holds a receiver and filters by recipient. A slow or failing peer
/// affects only its own task.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Frame>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.tx.subscribe()
    }

    /// Encode and queue one message. Never raises: an encode failure
    /// is logged and the frame dropped, and a send with no receivers
    /// is a no-op.
    pub fn publish(&self, outbound: &Outbound) {
        match outbound.message.to_json() {
            Ok(text) => {
                let _ = self.tx.send(Frame {
                    recipient: outbound.recipient,
                    data: text.into(),
                });
            }
            Err(e) => warn!("Failed to encode outbound message: {}", e),
        }
    }

    pub fn publish_all(&self, outbound: &[Outbound]) {
        for message in outbound {
            self.publish(message);
        }
    }
}

/// Connection tracking state (shared across connection handlers).
struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }
        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }
        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Run the sync server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));
    let broadcaster = Broadcaster::new(256);
    let state = Arc::new(RwLock::new(GameState::new(config.clone())));

    // Start the tick driver
    let tick_state = Arc::clone(&state);
    let tick_broadcaster = broadcaster.clone();
    let tick_interval = config.server.tick_interval_ms;
    tokio::spawn(async move {
        game::run_tick_loop(tick_state, tick_broadcaster, tick_interval).await;
    });

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        {
            let mut conns = conn_state.write().await;
            if !conns.try_add_connection(ip, max_connections, ip_limit) {
                warn!("Connection rejected (limit reached): {}", addr);
                continue;
            }
        }

        let state = Arc::clone(&state);
        let conn_state = Arc::clone(&conn_state);
        let broadcaster = broadcaster.clone();

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, state, broadcaster).await;

            // Always release the connection slot when done
            {
                let mut conns = conn_state.write().await;
                conns.remove_connection(ip);
            }

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection: accept, admit the session,
/// pump messages in both directions, and tear down on any exit path.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<RwLock<GameState>>,
    broadcaster: Broadcaster,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();

    // Subscribe before registering so this task sees its own welcome
    // and the roster update that announces it.
    let mut frames = broadcaster.subscribe();

    let (client_id, pending) = {
        let mut game = state.write().await;
        game.connect(addr)
    };
    broadcaster.publish_all(&pending);

    // Message loop - handle both inbound messages and broadcast frames
    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let pending = {
                            let mut game = state.write().await;
                            game.handle_message(client_id, text.as_str())
                        };
                        broadcaster.publish_all(&pending);
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => {
                        break;
                    }
                    // Binary, ping and pong frames carry no actions.
                    _ => {}
                }
            }
            frame = frames.recv() => {
                match frame {
                    Ok(frame) => {
                        if !frame.recipient.includes(client_id) {
                            continue;
                        }
                        if let Err(e) = write.send(Message::text(frame.data.to_string())).await {
                            warn!("Failed to send to {}: {}", addr, e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagged, skipped {} frames", addr, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }

    // Every exit path lands here exactly once per task; the registry
    // removal itself tolerates redundant calls.
    let pending = {
        let mut game = state.write().await;
        game.disconnect(client_id)
    };
    broadcaster.publish_all(&pending);

    Ok(())
}
