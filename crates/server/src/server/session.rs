//! Client session state and registry.

use crate::rate::{RateLimiterConfig, TokenBucket};
use protocol::{PlayerState, Rect};
use rand::distr::{Alphanumeric, SampleString};
use std::collections::HashMap;
use std::net::SocketAddr;

/// A connected client session.
///
/// Created at connection-accept, destroyed at disconnect. Player ids
/// are never persisted; a reconnect gets a fresh one.
#[derive(Debug)]
pub struct Session {
    /// Connection-scoped id, unique per process run.
    pub client_id: u32,
    /// Opaque player id shown on the wire.
    pub player_id: String,
    /// Remote address.
    pub addr: SocketAddr,
    /// The only region this player may plant in.
    pub home: Rect,
    /// Current position, bounded to the world.
    pub x: i32,
    pub y: i32,
    /// Planting limiter.
    pub limiter: TokenBucket,
    /// Epoch ms of the last successful plant.
    pub last_plant_at: u64,
}

impl Session {
    /// Create a session positioned at the center of its home.
    pub fn new(
        client_id: u32,
        addr: SocketAddr,
        player_id: String,
        home: Rect,
        limiter: RateLimiterConfig,
    ) -> Self {
        let (x, y) = home.center();
        Self {
            client_id,
            player_id,
            addr,
            home,
            x,
            y,
            limiter: TokenBucket::new(limiter),
            last_plant_at: 0,
        }
    }

    /// Roster entry for this session.
    pub fn state(&self) -> PlayerState {
        PlayerState {
            id: self.player_id.clone(),
            x: self.x,
            y: self.y,
            home: self.home,
        }
    }
}

/// Generate an anonymous per-connection player id.
pub fn generate_player_id() -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), 8);
    format!("p_{}", suffix.to_lowercase())
}

/// Deterministic home rectangle for a player id.
///
/// A rolling multiply-add hash over the id bytes is reduced into the
/// coordinate space left over once the home square is subtracted from
/// the world, so the whole rectangle always fits in bounds and the
/// same id lands in the same area for the life of the process. Not
/// cryptographic; determinism is the only requirement.
pub fn home_rect_for_player(player_id: &str, world_w: i32, world_h: i32, home_size: i32) -> Rect {
    let mut h: u32 = 0;
    for b in player_id.bytes() {
        h = h.wrapping_mul(31).wrapping_add(b as u32);
    }
    let max_x = (world_w - home_size).max(1) as u32;
    let max_y = (world_h - home_size).max(1) as u32;
    Rect {
        x: (h % max_x) as i32,
        y: ((h / max_x) % max_y) as i32,
        w: home_size,
        h: home_size,
    }
}

/// Connected sessions, keyed by connection with a player-id index.
#[derive(Debug)]
pub struct SessionRegistry {
    next_client_id: u32,
    sessions: HashMap<u32, Session>,
    by_player: HashMap<String, u32>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            next_client_id: 1,
            sessions: HashMap::new(),
            by_player: HashMap::new(),
        }
    }

    /// Allocate the next connection id.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_client_id;
        self.next_client_id = self.next_client_id.wrapping_add(1).max(1);
        id
    }

    pub fn insert(&mut self, session: Session) {
        self.by_player
            .insert(session.player_id.clone(), session.client_id);
        self.sessions.insert(session.client_id, session);
    }

    /// Remove a session. Removing an unknown id is a no-op, so
    /// redundant close/error signals from the transport are harmless.
    pub fn remove(&mut self, client_id: u32) -> Option<Session> {
        let session = self.sessions.remove(&client_id)?;
        self.by_player.remove(&session.player_id);
        Some(session)
    }

    pub fn get(&self, client_id: u32) -> Option<&Session> {
        self.sessions.get(&client_id)
    }

    pub fn get_mut(&mut self, client_id: u32) -> Option<&mut Session> {
        self.sessions.get_mut(&client_id)
    }

    pub fn by_player_id(&self, player_id: &str) -> Option<&Session> {
        self.by_player
            .get(player_id)
            .and_then(|id| self.sessions.get(id))
    }

    /// Full roster snapshot for the `players` broadcast, in stable
    /// (player id) order.
    pub fn roster(&self) -> Vec<PlayerState> {
        let mut players: Vec<PlayerState> =
            self.sessions.values().map(Session::state).collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
