// Simulation tuning parameters.
//
// `SimConfig` holds the handful of numbers the rules read that are not part
// of the per-name game data tables: tile size for the pixel mapping, the
// per-tick movement step, the snap epsilon for waypoint arrival, and the enemy
// activation radius. Loaded from JSON or taken from `Default`.
//
// Every participant in a session must use the same config, since these values
// feed movement and AI decisions directly.
//
// See also: `data.rs` for creature/item/skill definitions, `sim.rs` which
// owns a `SimConfig` inside the `Simulation` context.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Edge length of one tile in pixels.
    pub tile_size: f32,
    /// Pixels a moving creature advances per tick, per axis.
    pub move_speed_px: f32,
    /// A creature within this many pixels of its next waypoint snaps onto it.
    pub snap_epsilon_px: f32,
    /// Enemies wake once the nearest player is at most this many path steps
    /// away.
    pub activation_range: usize,
    /// Creature definition spawned for each joining player.
    pub player_creature: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tile_size: 64.0,
            move_speed_px: 3.0,
            snap_epsilon_px: 3.0,
            activation_range: 10,
            player_creature: "Player".into(),
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
