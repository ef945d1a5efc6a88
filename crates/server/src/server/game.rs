//! Game state and per-action processing.
//!
//! Every entry point is a single validate-then-apply step performed
//! under the state lock. Messages produced by a step are returned as
//! pending [`Outbound`]s and serialized/sent by the caller after the
//! lock is released.

use crate::config::Config;
use crate::rate::{RateLimiterConfig, epoch_ms};
use crate::server::session::{Session, SessionRegistry, generate_player_id, home_rect_for_player};
use crate::world::World;
use protocol::{ClientMessage, DeltaTile, Plant, PlantType, ServerMessage, WorldSize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use super::{Broadcaster, Outbound, Recipient};

/// Shared authoritative state: the world grid plus connected sessions.
pub struct GameState {
    config: Config,
    pub world: World,
    pub sessions: SessionRegistry,
}

impl GameState {
    pub fn new(config: Config) -> Self {
        let world = World::new(config.world.width, config.world.height);
        Self {
            world,
            sessions: SessionRegistry::new(),
            config,
        }
    }

    fn limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            interval_ms: self.config.plant.rate_interval_ms,
            max_tokens: self.config.plant.rate_burst,
        }
    }

    /// Admit a new connection: register a session and queue its
    /// welcome, the full tile snapshot, and a roster update for
    /// everyone (the new session included).
    pub fn connect(&mut self, addr: SocketAddr) -> (u32, Vec<Outbound>) {
        let client_id = self.sessions.next_id();
        let player_id = generate_player_id();
        let home = home_rect_for_player(
            &player_id,
            self.config.world.width,
            self.config.world.height,
            self.config.world.home_size,
        );
        let session = Session::new(client_id, addr, player_id.clone(), home, self.limiter_config());
        self.sessions.insert(session);
        info!("Player {} joined from {} (home {:?})", player_id, addr, home);

        let outbound = vec![
            Outbound::to(
                Recipient::Client(client_id),
                ServerMessage::Welcome {
                    player_id,
                    world_size: WorldSize {
                        w: self.world.width(),
                        h: self.world.height(),
                    },
                    home,
                    now: epoch_ms(),
                },
            ),
            Outbound::to(
                Recipient::Client(client_id),
                ServerMessage::FullState {
                    tiles: self.world.snapshot(),
                },
            ),
            self.roster_broadcast(),
        ];
        (client_id, outbound)
    }

    /// Tear down a session and queue a roster update. Safe to call
    /// more than once: a second call for the same id does nothing.
    pub fn disconnect(&mut self, client_id: u32) -> Vec<Outbound> {
        match self.sessions.remove(client_id) {
            Some(session) => {
                info!(
                    "Player {} left ({} online)",
                    session.player_id,
                    self.sessions.len()
                );
                vec![self.roster_broadcast()]
            }
            None => Vec::new(),
        }
    }

    /// Parse and dispatch one inbound message.
    ///
    /// Malformed or unrecognized messages are dropped without closing
    /// the connection; validation rejections are silent no-ops toward
    /// the client (logged here as telemetry).
    pub fn handle_message(&mut self, client_id: u32, text: &str) -> Vec<Outbound> {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(client_id, error = %e, "dropping unparseable message");
                return Vec::new();
            }
        };

        match message {
            ClientMessage::Move { dx, dy } => self.handle_move(client_id, dx, dy),
            ClientMessage::Plant { x, y, plant_type } => {
                self.handle_plant(client_id, x, y, plant_type)
            }
            ClientMessage::Clear { x, y } => self.handle_clear(client_id, x, y),
            ClientMessage::Ping { t } => {
                vec![Outbound::to(
                    Recipient::Client(client_id),
                    ServerMessage::Pong { t },
                )]
            }
            // Accepted but inert until partial subscriptions exist.
            ClientMessage::RequestViewport { .. } => Vec::new(),
        }
    }

    fn handle_move(&mut self, client_id: u32, dx: i32, dy: i32) -> Vec<Outbound> {
        if dx.abs() > 1 || dy.abs() > 1 {
            debug!(client_id, dx, dy, "move rejected: not a single-tile step");
            return Vec::new();
        }
        let Some(session) = self.sessions.get_mut(client_id) else {
            return Vec::new();
        };
        let nx = session.x + dx;
        let ny = session.y + dy;
        if !self.world.in_bounds(nx, ny) {
            debug!(client_id, nx, ny, "move rejected: out of bounds");
            return Vec::new();
        }
        session.x = nx;
        session.y = ny;
        vec![Outbound::to(
            Recipient::All,
            ServerMessage::PlayerMove {
                id: session.player_id.clone(),
                x: nx,
                y: ny,
            },
        )]
    }

    fn handle_plant(&mut self, client_id: u32, x: i32, y: i32, plant_type: PlantType) -> Vec<Outbound> {
        let now = epoch_ms();
        let Some(session) = self.sessions.get_mut(client_id) else {
            return Vec::new();
        };
        if now.saturating_sub(session.last_plant_at) < self.config.plant.cooldown_ms {
            debug!(client_id, "plant rejected: cooldown");
            return Vec::new();
        }
        if !session.limiter.take_at(now) {
            debug!(client_id, "plant rejected: rate limited");
            return Vec::new();
        }
        if !session.home.contains(x, y) {
            debug!(client_id, x, y, "plant rejected: outside home");
            return Vec::new();
        }
        let plant = Plant {
            plant_type,
            owner: session.player_id.clone(),
            planted_at: now,
        };
        if self.world.plant(x, y, plant) {
            session.last_plant_at = now;
        }
        // The new tile reaches everyone with the next tick's delta.
        Vec::new()
    }

    fn handle_clear(&mut self, client_id: u32, x: i32, y: i32) -> Vec<Outbound> {
        let Some(session) = self.sessions.get(client_id) else {
            return Vec::new();
        };
        let owned = match self.world.get(x, y) {
            Some(plant) => plant.owner == session.player_id,
            None => {
                debug!(client_id, x, y, "clear rejected: empty tile");
                return Vec::new();
            }
        };
        if owned {
            self.world.clear(x, y);
        } else {
            debug!(client_id, x, y, "clear rejected: not the owner");
        }
        Vec::new()
    }

    /// Drain accumulated world changes into one batched delta, or
    /// nothing when the changelog is empty (no empty broadcasts).
    pub fn drain_tick(&mut self) -> Option<Outbound> {
        let changes = self.world.drain_changes();
        if changes.is_empty() {
            return None;
        }
        let tiles = changes
            .into_iter()
            .map(|c| match c.plant {
                Some(p) => DeltaTile::Planted(c.x, c.y, p.plant_type, p.owner, p.planted_at),
                None => DeltaTile::Cleared(c.x, c.y, ()),
            })
            .collect();
        Some(Outbound::to(
            Recipient::All,
            ServerMessage::Delta { tiles },
        ))
    }

    fn roster_broadcast(&self) -> Outbound {
        Outbound::to(
            Recipient::All,
            ServerMessage::Players {
                players: self.sessions.roster(),
            },
        )
    }
}

/// Fixed-interval tick driver: drain the changelog under the write
/// lock, then encode and broadcast with the lock released.
pub async fn run_tick_loop(
    state: Arc<RwLock<GameState>>,
    broadcaster: Broadcaster,
    tick_interval_ms: u64,
) {
    let start = Instant::now() + Duration::from_millis(tick_interval_ms);
    let mut ticker = interval_at(start, Duration::from_millis(tick_interval_ms));
    // Skip missed ticks instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let outbound = {
            let mut game = state.write().await;
            game.drain_tick()
        };
        if let Some(outbound) = outbound {
            broadcaster.publish(&outbound);
        }
    }
}
