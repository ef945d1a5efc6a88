//! Shared protocol crate for tile-garden.
//!
//! This crate contains:
//! - Message definitions for both directions of the wire
//! - Shared types (PlantType, Plant, Rect, etc.)
//!
//! Every message on the wire is a UTF-8 JSON object shaped
//! `{ "type": "<tag>", "payload": { ... } }`.

mod error;
pub mod messages;

pub use error::ProtocolError;
pub use messages::{ClientMessage, DeltaTile, ServerMessage, SnapshotTile};

use serde::{Deserialize, Serialize};

/// What can grow on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantType {
    Seed,
    Flower,
    Tree,
}

/// Contents of an occupied tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plant {
    pub plant_type: PlantType,
    /// Player id of the session that planted it.
    pub owner: String,
    /// Epoch milliseconds at planting time.
    pub planted_at: u64,
}

/// An axis-aligned rectangle in tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    /// Whether a tile coordinate falls inside this rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.w && y < self.y + self.h
    }

    /// Center tile of the rectangle.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }
}

/// World dimensions, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSize {
    pub w: i32,
    pub h: i32,
}

/// One player's entry in a roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub home: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_type_lowercase_on_wire() {
        assert_eq!(serde_json::to_string(&PlantType::Seed).unwrap(), "\"seed\"");
        assert_eq!(serde_json::to_string(&PlantType::Tree).unwrap(), "\"tree\"");
        let t: PlantType = serde_json::from_str("\"flower\"").unwrap();
        assert_eq!(t, PlantType::Flower);
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect { x: 10, y: 10, w: 20, h: 20 };
        assert!(r.contains(10, 10));
        assert!(r.contains(29, 29));
        assert!(!r.contains(30, 10));
        assert!(!r.contains(9, 15));
    }

    #[test]
    fn test_rect_center() {
        let r = Rect { x: 10, y: 20, w: 20, h: 20 };
        assert_eq!(r.center(), (20, 30));
    }
}
