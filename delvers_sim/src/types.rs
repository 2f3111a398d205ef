// Core types shared across the simulation.
//
// Defines grid coordinates (`GridPoint`), render-space positions
// (`PixelPoint`), object identifiers (`NetworkId`), team alignment, and the
// fixed slot counts for equipment and inventory. Everything derives serde so
// that events, snapshots, and whole-world comparisons in tests can go through
// JSON.
//
// **Critical constraint: determinism.** `NetworkId`s come from a counter owned
// by `World` and only advanced inside event application, so every replica
// hands out the same ids in the same order.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

pub use delvers_protocol::PlayerId;

/// Number of equipment slots on a creature (one per `EquipSlot`).
pub const EQUIPMENT_SLOTS: usize = 5;
/// Number of carried inventory slots on a creature.
pub const INVENTORY_SIZE: usize = 5;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A discrete tile coordinate. X grows to the east, Y grows to the south.
///
/// Ordered by `(x, y)` so that sets of points iterate deterministically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance. This is the range metric for skills and the step
    /// metric for pathfinding.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours in N, E, S, W order.
    pub fn neighbors4(self) -> SmallVec<[GridPoint; 4]> {
        SmallVec::from_buf([
            self.offset(0, -1),
            self.offset(1, 0),
            self.offset(0, 1),
            self.offset(-1, 0),
        ])
    }

    /// Unit direction (`signum` per axis) from `self` toward `other`.
    pub fn direction_to(self, other: Self) -> (i32, i32) {
        ((other.x - self.x).signum(), (other.y - self.y).signum())
    }

    /// Top-left pixel of this tile.
    pub fn to_pixels(self, tile_size: f32) -> PixelPoint {
        PixelPoint {
            x: self.x as f32 * tile_size,
            y: self.y as f32 * tile_size,
        }
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A render-space position in pixels. Only `Move` animates this; the grid
/// position is what the rules read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Durable id for a simulated object (creature or item), stable across the
/// network. Never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Passability filter for pathfinding. A creature is never blocked by an
/// ally; `Any` ignores occupants entirely (used for distance estimates).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Any,
    Player,
    Enemy,
}

impl Team {
    pub fn of(is_player_team: bool) -> Self {
        if is_player_team {
            Team::Player
        } else {
            Team::Enemy
        }
    }

    /// Whether a cell holding a creature of the given alignment blocks
    /// movement for this team.
    pub fn blocked_by(self, occupant_is_player_team: bool) -> bool {
        match self {
            Team::Any => false,
            Team::Player => !occupant_is_player_team,
            Team::Enemy => occupant_is_player_team,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = GridPoint::new(2, -3);
        let b = GridPoint::new(-1, 4);
        assert_eq!(a.manhattan_distance(b), 10);
        assert_eq!(b.manhattan_distance(a), 10);
        assert_eq!(a.manhattan_distance(a), 0);
    }

    #[test]
    fn pixels_scale_by_tile_size() {
        let p = GridPoint::new(8, 4).to_pixels(64.0);
        assert_eq!(p, PixelPoint { x: 512.0, y: 256.0 });
    }

    #[test]
    fn direction_is_unit_per_axis() {
        let a = GridPoint::new(5, 5);
        assert_eq!(a.direction_to(GridPoint::new(9, 5)), (1, 0));
        assert_eq!(a.direction_to(GridPoint::new(2, 1)), (-1, -1));
        assert_eq!(a.direction_to(a), (0, 0));
    }

    #[test]
    fn team_passability_rules() {
        assert!(!Team::Any.blocked_by(true));
        assert!(!Team::Any.blocked_by(false));
        assert!(Team::Player.blocked_by(false));
        assert!(!Team::Player.blocked_by(true));
        assert!(Team::Enemy.blocked_by(true));
        assert!(!Team::Enemy.blocked_by(false));
    }

    #[test]
    fn grid_points_order_by_x_then_y() {
        let mut pts = vec![
            GridPoint::new(1, 0),
            GridPoint::new(0, 5),
            GridPoint::new(0, 1),
        ];
        pts.sort();
        assert_eq!(
            pts,
            vec![GridPoint::new(0, 1), GridPoint::new(0, 5), GridPoint::new(1, 0)]
        );
    }
}
