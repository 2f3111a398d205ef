// delvers_sim: deterministic game core for Delvers.
//
// This crate holds every rule of the game: the tile grid and what stands on
// it, pathfinding, skills, the replicated event stream, the players' turn
// barrier, and the enemy AI. It does no I/O, spawns no threads, and never
// reads a clock, so the same event sequence yields the same world on every
// machine. The net crate drives it.
//
// Module overview:
// - `sim.rs`:         `Simulation`, the per-replica context: tick loop and
//                     event application.
// - `world.rs`:       `World`, the spatial model (tiles, creature and item
//                     indices, player registry).
// - `entity.rs`:      `Creature`, `Item`, `StatBlock`, `EquipSlot`.
// - `pathfinding.rs`: Team-aware A* over the tile grid.
// - `skill.rs`:       Skill range checks, target expansion, damage.
// - `event.rs`:       `Event` / `Action` and their payload structs.
// - `codec.rs`:       Versioned event codec registry (tag, version, decoder).
// - `event_log.rs`:   Active queue, history, and the admission journal.
// - `turn.rs`:        `TurnState`: per-player action slots and the barrier.
// - `ai.rs`:          Enemy activation and turn planning.
// - `data.rs`:        `GameData`: creature, item, and skill definitions.
// - `snapshot.rs`:    `WorldSnapshot`, the initial map carried by `GameStart`.
// - `config.rs`:      `SimConfig` tuning values.
// - `types.rs`:       `GridPoint`, `PixelPoint`, `NetworkId`, `Team`.
// - `error.rs`:       `SpatialError`, `CodecError`, `DataError`.
//
// **Critical constraint: determinism.** No `HashMap`, no system time, no
// randomness. Use `BTreeMap`/`BTreeSet` wherever iteration order can reach
// game state.

pub mod ai;
pub mod codec;
pub mod config;
pub mod data;
pub mod entity;
pub mod error;
pub mod event;
pub mod event_log;
pub mod pathfinding;
pub mod sim;
pub mod skill;
pub mod snapshot;
pub mod turn;
pub mod types;
pub mod world;

pub use config::SimConfig;
pub use data::GameData;
pub use error::{CodecError, DataError, SpatialError};
pub use event::{Action, Event};
pub use sim::{Applied, Role, Simulation};
pub use snapshot::WorldSnapshot;
pub use types::{GridPoint, NetworkId, PixelPoint, PlayerId, Team};
pub use world::World;
