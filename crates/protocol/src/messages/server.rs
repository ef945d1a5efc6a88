//! Server -> Client message building.

use serde::{Deserialize, Serialize};

use crate::{PlantType, PlayerState, ProtocolError, Rect, WorldSize};

/// One occupied tile in a full snapshot: `[x, y, type, owner, plantedAt]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTile(pub i32, pub i32, pub PlantType, pub String, pub u64);

/// One tile change in a delta broadcast.
///
/// Encoded as `[x, y, type, owner, plantedAt]` for a planted tile and
/// `[x, y, null]` for a cleared one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeltaTile {
    Planted(i32, i32, PlantType, String, u64),
    Cleared(i32, i32, ()),
}

/// Server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once per connection, before anything else.
    #[serde(rename_all = "camelCase")]
    Welcome {
        player_id: String,
        world_size: WorldSize,
        home: Rect,
        now: u64,
    },
    /// Full listing of every occupied tile; follows the welcome.
    FullState { tiles: Vec<SnapshotTile> },
    /// Batched tile changes accumulated since the previous tick.
    Delta { tiles: Vec<DeltaTile> },
    /// Full roster snapshot, sent on every join and leave.
    Players { players: Vec<PlayerState> },
    /// Immediate single-player position update.
    PlayerMove { id: String, x: i32, y: i32 },
    /// Echo of a client ping.
    Pong { t: f64 },
    /// Reserved: no current action path emits this.
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Encode to wire text.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_wire_shape() {
        let msg = ServerMessage::Welcome {
            player_id: "p_ab12cd34".into(),
            world_size: WorldSize { w: 50, h: 50 },
            home: Rect { x: 6, y: 12, w: 20, h: 20 },
            now: 1_000,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "welcome");
        assert_eq!(json["payload"]["playerId"], "p_ab12cd34");
        assert_eq!(json["payload"]["worldSize"]["w"], 50);
        assert_eq!(json["payload"]["home"]["x"], 6);
        assert_eq!(json["payload"]["now"], 1_000);
    }

    #[test]
    fn test_full_state_tiles_are_arrays() {
        let msg = ServerMessage::FullState {
            tiles: vec![SnapshotTile(3, 4, PlantType::Seed, "p_x".into(), 99)],
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "fullState");
        assert_eq!(
            json["payload"]["tiles"][0],
            serde_json::json!([3, 4, "seed", "p_x", 99])
        );
    }

    #[test]
    fn test_delta_planted_tile_shape() {
        let tile = DeltaTile::Planted(1, 2, PlantType::Flower, "p_a".into(), 42);
        let json = serde_json::to_value(&tile).unwrap();
        assert_eq!(json, serde_json::json!([1, 2, "flower", "p_a", 42]));
    }

    #[test]
    fn test_delta_cleared_tile_is_null_marker() {
        let tile = DeltaTile::Cleared(7, 8, ());
        let json = serde_json::to_value(&tile).unwrap();
        assert_eq!(json, serde_json::json!([7, 8, null]));
    }

    #[test]
    fn test_delta_tile_round_trip() {
        let planted: DeltaTile = serde_json::from_str(r#"[1,2,"seed","p_a",42]"#).unwrap();
        assert_eq!(
            planted,
            DeltaTile::Planted(1, 2, PlantType::Seed, "p_a".into(), 42)
        );
        let cleared: DeltaTile = serde_json::from_str("[7,8,null]").unwrap();
        assert_eq!(cleared, DeltaTile::Cleared(7, 8, ()));
    }

    #[test]
    fn test_player_move_wire_shape() {
        let msg = ServerMessage::PlayerMove { id: "p_a".into(), x: 5, y: 6 };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "playerMove");
        assert_eq!(json["payload"]["id"], "p_a");
        assert_eq!(json["payload"]["x"], 5);
    }

    #[test]
    fn test_pong_echoes_t() {
        let msg = ServerMessage::Pong { t: 1234.5 };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "pong");
        assert_eq!(json["payload"]["t"], 1234.5);
    }

    #[test]
    fn test_players_roster_shape() {
        let msg = ServerMessage::Players {
            players: vec![crate::PlayerState {
                id: "p_a".into(),
                x: 1,
                y: 2,
                home: Rect { x: 0, y: 0, w: 20, h: 20 },
            }],
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "players");
        assert_eq!(json["payload"]["players"][0]["id"], "p_a");
        assert_eq!(json["payload"]["players"][0]["home"]["w"], 20);
    }

    #[test]
    fn test_to_json_produces_envelope() {
        let text = ServerMessage::Pong { t: 1.0 }.to_json().unwrap();
        assert!(text.contains("\"type\":\"pong\""));
        assert!(text.contains("\"payload\""));
    }
}
