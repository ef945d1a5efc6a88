//! World state management.
//!
//! The authoritative tile grid. Every accepted mutation appends one
//! entry to a changelog that the tick driver drains for delta
//! broadcasts; the enclosing state lock makes a drain atomic with
//! respect to concurrent mutations.

use protocol::{Plant, SnapshotTile};
use std::collections::HashMap;

/// A single recorded tile mutation. `plant` is `None` for a clear.
#[derive(Debug, Clone, PartialEq)]
pub struct TileChange {
    pub x: i32,
    pub y: i32,
    pub plant: Option<Plant>,
}

/// The tile grid and its pending changelog.
#[derive(Debug)]
pub struct World {
    width: i32,
    height: i32,
    tiles: HashMap<(i32, i32), Plant>,
    pending: Vec<TileChange>,
}

impl World {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            tiles: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Plant> {
        self.tiles.get(&(x, y))
    }

    /// Put a plant on a tile, overwriting any existing one.
    ///
    /// Returns false (and records nothing) for out-of-bounds
    /// coordinates.
    pub fn plant(&mut self, x: i32, y: i32, plant: Plant) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.tiles.insert((x, y), plant.clone());
        self.pending.push(TileChange {
            x,
            y,
            plant: Some(plant),
        });
        true
    }

    /// Remove the plant from a tile.
    ///
    /// Returns false (and records nothing) when the coordinate is out
    /// of bounds or the tile is already empty.
    pub fn clear(&mut self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let existed = self.tiles.remove(&(x, y)).is_some();
        if existed {
            self.pending.push(TileChange { x, y, plant: None });
        }
        existed
    }

    /// Take every change recorded since the previous drain, in call
    /// order. A second immediate drain returns nothing.
    pub fn drain_changes(&mut self) -> Vec<TileChange> {
        std::mem::take(&mut self.pending)
    }

    /// Full listing of all occupied tiles, sorted by coordinate.
    /// Does not consume the changelog.
    pub fn snapshot(&self) -> Vec<SnapshotTile> {
        let mut tiles: Vec<SnapshotTile> = self
            .tiles
            .iter()
            .map(|(&(x, y), plant)| {
                SnapshotTile(x, y, plant.plant_type, plant.owner.clone(), plant.planted_at)
            })
            .collect();
        tiles.sort_by_key(|t| (t.0, t.1));
        tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::PlantType;

    fn seed(owner: &str) -> Plant {
        Plant {
            plant_type: PlantType::Seed,
            owner: owner.to_string(),
            planted_at: 100,
        }
    }

    #[test]
    fn test_plant_and_get() {
        let mut world = World::new(50, 50);
        assert!(world.plant(3, 4, seed("p_a")));
        assert_eq!(world.get(3, 4).unwrap().owner, "p_a");
        assert!(world.get(4, 3).is_none());
    }

    #[test]
    fn test_out_of_bounds_has_no_effect() {
        let mut world = World::new(50, 50);
        assert!(!world.plant(-1, 0, seed("p_a")));
        assert!(!world.plant(0, 50, seed("p_a")));
        assert!(!world.clear(50, 0));
        assert_eq!(world.tile_count(), 0);
        assert!(world.drain_changes().is_empty());
    }

    #[test]
    fn test_clear_absent_tile_records_nothing() {
        let mut world = World::new(50, 50);
        assert!(!world.clear(1, 1));
        assert!(world.drain_changes().is_empty());
    }

    #[test]
    fn test_changelog_order_and_drain() {
        let mut world = World::new(50, 50);
        world.plant(1, 1, seed("p_a"));
        world.plant(2, 2, seed("p_a"));
        world.clear(1, 1);

        let changes = world.drain_changes();
        assert_eq!(changes.len(), 3);
        assert_eq!((changes[0].x, changes[0].y), (1, 1));
        assert!(changes[0].plant.is_some());
        assert_eq!((changes[1].x, changes[1].y), (2, 2));
        assert_eq!((changes[2].x, changes[2].y), (1, 1));
        assert!(changes[2].plant.is_none());

        // Second immediate drain is empty.
        assert!(world.drain_changes().is_empty());
    }

    #[test]
    fn test_overwrite_records_both_changes() {
        let mut world = World::new(50, 50);
        world.plant(5, 5, seed("p_a"));
        let tree = Plant {
            plant_type: PlantType::Tree,
            owner: "p_a".to_string(),
            planted_at: 200,
        };
        world.plant(5, 5, tree);
        assert_eq!(world.tile_count(), 1);
        assert_eq!(world.get(5, 5).unwrap().plant_type, PlantType::Tree);
        assert_eq!(world.drain_changes().len(), 2);
    }

    #[test]
    fn test_snapshot_reflects_net_effect() {
        let mut world = World::new(50, 50);
        world.plant(1, 1, seed("p_a"));
        world.plant(2, 2, seed("p_b"));
        world.clear(1, 1);

        let snapshot = world.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!((snapshot[0].0, snapshot[0].1), (2, 2));
        assert_eq!(snapshot[0].3, "p_b");

        // Snapshot neither consumes the changelog nor varies on repeat.
        assert_eq!(world.snapshot(), snapshot);
        assert_eq!(world.drain_changes().len(), 3);
    }

    #[test]
    fn test_snapshot_sorted_by_coordinate() {
        let mut world = World::new(50, 50);
        world.plant(9, 0, seed("p_a"));
        world.plant(2, 7, seed("p_a"));
        world.plant(2, 3, seed("p_a"));
        let coords: Vec<(i32, i32)> = world.snapshot().iter().map(|t| (t.0, t.1)).collect();
        assert_eq!(coords, vec![(2, 3), (2, 7), (9, 0)]);
    }
}
