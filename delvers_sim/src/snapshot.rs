// Initial world snapshot consumed by `GameStart`.
//
// Map generation is not part of the core; whatever produces a level hands the
// sim a `WorldSnapshot`: map dimensions, the floor tiles, initial creature
// placements, ground items, and the start location players spawn around. The
// snapshot travels inside the `GameStart` event, so a late joiner rebuilds the
// exact same map from the journal.
//
// `WorldSnapshot::arena` builds a walled rectangular room with a couple of
// monsters and the two starter items, which is what the server binary uses
// when no map file is given.

use serde::{Deserialize, Serialize};

use crate::types::GridPoint;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePlacement {
    pub name: String,
    pub at: GridPoint,
}

/// A creature or item definition name placed at a point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub name: String,
    pub at: GridPoint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<TilePlacement>,
    /// Enemy creatures. Players are spawned later by `NewPlayer`.
    #[serde(default)]
    pub creatures: Vec<Placement>,
    #[serde(default)]
    pub items: Vec<Placement>,
    pub start: GridPoint,
}

impl WorldSnapshot {
    /// A `width` x `height` room of floor with a one-tile wall border (wall
    /// cells have no tile). Starter items sit at `start + (1, 2)`.
    pub fn arena(width: i32, height: i32, start: GridPoint) -> Self {
        let mut tiles = Vec::new();
        for x in 1..width - 1 {
            for y in 1..height - 1 {
                tiles.push(TilePlacement {
                    name: "Floor".into(),
                    at: GridPoint::new(x, y),
                });
            }
        }

        let loot = start.offset(1, 2);
        Self {
            width,
            height,
            tiles,
            creatures: vec![
                Placement {
                    name: "Goblin".into(),
                    at: GridPoint::new(width - 3, height - 3),
                },
                Placement {
                    name: "Skeleton".into(),
                    at: GridPoint::new(width - 3, 2),
                },
            ],
            items: vec![
                Placement {
                    name: "Sapphire Staff".into(),
                    at: loot,
                },
                Placement {
                    name: "Leather Armor".into(),
                    at: loot,
                },
            ],
            start,
        }
    }

    /// An arena with no monsters or loot, for tests that need a quiet map.
    pub fn empty_room(width: i32, height: i32, start: GridPoint) -> Self {
        Self {
            creatures: Vec::new(),
            items: Vec::new(),
            ..Self::arena(width, height, start)
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
