// Enemy turn: activation and planning.
//
// Two passes, both iterating enemies (non-player-team, alive) in ascending
// `NetworkId` order:
//
// 1. `activate_enemies` wakes every enemy whose nearest player is within
//    `activation_range` path steps. Activation is sticky. This pass mutates
//    the world, so every replica runs it when it applies `EnemyTurn`.
// 2. `plan_enemy_turn` decides what each active enemy does: walk next to its
//    nearest player (ideally the cell just south of it, else the first free
//    N/E/S/W neighbour), at most `movement` steps, then swing its first skill
//    if the player is in range from where it ends up. Only the server plans;
//    the result goes out as ordinary `Move`/`UseSkill` events.
//
// "Nearest" is by `Team::Any` path length (walls matter, bodies do not), ties
// to the lower `PlayerId`. Players whose creature is dead are ignored.
// Destinations already claimed by an earlier enemy this turn count as
// occupied, so two enemies do not plan into the same cell.
//
// See also: `pathfinding.rs`, `skill.rs` for the range check, `sim.rs` where
// `EnemyTurn` is applied.
//
// **Critical constraint: determinism.** Activation runs on every replica and
// must produce identical flags; iteration is by id and paths are
// deterministic.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::config::SimConfig;
use crate::data::GameData;
use crate::event::{Event, MoveEvent, UseSkillEvent};
use crate::pathfinding::find_path;
use crate::skill::{SkillTarget, can_use_skill};
use crate::types::{GridPoint, NetworkId, PlayerId, Team};
use crate::world::World;

/// The player an enemy would go after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quarry {
    pub player: PlayerId,
    pub creature: NetworkId,
    pub position: GridPoint,
    /// Path steps from the enemy.
    pub distance: usize,
}

pub fn nearest_player(world: &World, from: GridPoint) -> Option<Quarry> {
    let mut best: Option<Quarry> = None;
    for (player, creature) in world.players() {
        let Some(c) = world.living(creature) else {
            continue;
        };
        let path = find_path(world, from, c.position, Team::Any);
        if path.is_empty() {
            continue;
        }
        let distance = path.len() - 1;
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(Quarry {
                player,
                creature,
                position: c.position,
                distance,
            });
        }
    }
    best
}

fn enemy_ids(world: &World) -> Vec<NetworkId> {
    world
        .creatures()
        .filter(|c| c.is_alive() && !c.is_player_team)
        .map(|c| c.id)
        .collect()
}

/// Wake enemies that have a player within range. Returns the newly woken.
pub fn activate_enemies(world: &mut World, config: &SimConfig) -> Vec<NetworkId> {
    let mut woken = Vec::new();
    for id in enemy_ids(world) {
        let Some(c) = world.living(id) else {
            continue;
        };
        if c.is_activated {
            continue;
        }
        let in_range = nearest_player(world, c.position)
            .is_some_and(|q| q.distance <= config.activation_range);
        if in_range {
            if let Some(c) = world.creature_mut(id) {
                c.is_activated = true;
            }
            info!(creature = %id, "enemy activated");
            woken.push(id);
        }
    }
    woken
}

/// Cell `enemy` should walk to in order to stand next to `target`.
fn destination(world: &World, enemy: NetworkId, target: GridPoint, claimed: &BTreeSet<GridPoint>) -> Option<GridPoint> {
    let usable = |p: GridPoint| {
        world.tile_at(p).is_some()
            && !claimed.contains(&p)
            && world.creature_id_at(p).is_none_or(|occupant| occupant == enemy)
    };
    let below = target.offset(0, 1);
    if usable(below) {
        return Some(below);
    }
    target.neighbors4().into_iter().find(|p| usable(*p))
}

/// Events for every active enemy's turn, in id order. Does not include the
/// closing `TurnChange`.
pub fn plan_enemy_turn(world: &World, data: &GameData) -> Vec<Event> {
    let mut events = Vec::new();
    let mut claimed = BTreeSet::new();

    for id in enemy_ids(world) {
        let Some(enemy) = world.living(id) else {
            continue;
        };
        if !enemy.is_activated {
            continue;
        }
        let Some(quarry) = nearest_player(world, enemy.position) else {
            continue;
        };

        let mut end = enemy.position;
        if let Some(dest) = destination(world, id, quarry.position, &claimed) {
            claimed.insert(dest);
            let mut path = find_path(world, enemy.position, dest, Team::Enemy);
            let movement = world
                .effective_stats(id)
                .map_or(0, |s| s.movement.max(0) as usize);
            path.truncate(movement + 1);
            if let Some(last) = path.last() {
                end = *last;
            }
            if path.len() > 1 {
                events.push(Event::Move(MoveEvent { creature: id, path }));
            }
        }
        claimed.insert(end);

        let target = SkillTarget::creature(quarry.creature, quarry.position);
        if let Some(skill) = world.skills_of(id).into_iter().next() {
            if can_use_skill(world, data, &skill, id, &target, Some(end)) {
                events.push(Event::UseSkill(UseSkillEvent {
                    skill,
                    source: id,
                    target,
                }));
            }
        }
        debug!(creature = %id, quarry = %quarry.player, %end, "enemy planned");
    }
    events
}
