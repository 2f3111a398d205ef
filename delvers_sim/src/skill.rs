// Skill range checks, target-set expansion, and damage application.
//
// Three entry points, all pure functions over `World` + `GameData`:
//
// - `can_use_skill`: stamina and range gate. Range is Manhattan distance
//   between the actor (or an override location, used when proposing a skill
//   to be cast after a pending move) and the target. Melee-tagged skills reach
//   one tile further when the actor wears an item with `extended_reach`.
// - `resolve_targets`: the set of cells the skill hits. Starts with the direct
//   target and adds cells per declared `SkillEffect`, in declaration order.
//   The effects compose additively; the result is a `BTreeSet` so duplicates
//   collapse and iteration order is fixed.
// - `apply_damage`: hits every occupied target cell, removes creatures that
//   drop to zero life, and charges the actor's stamina exactly once.
//
// A skill aimed at a creature that has since died whiffs: no targets, no
// damage, but stamina is still spent. Stale intent loses to resolved state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{GameData, SkillDef, SkillEffect, SkillTag};
use crate::types::{GridPoint, NetworkId};
use crate::world::World;

/// What a skill is aimed at: a creature (tracked to wherever it currently
/// stands) or a bare ground location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillTarget {
    pub creature: Option<NetworkId>,
    pub location: GridPoint,
}

impl SkillTarget {
    pub fn creature(id: NetworkId, at: GridPoint) -> Self {
        Self {
            creature: Some(id),
            location: at,
        }
    }

    pub fn ground(at: GridPoint) -> Self {
        Self {
            creature: None,
            location: at,
        }
    }
}

/// Outcome of one skill use, for logging and applied-event notifications.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkillOutcome {
    /// `(creature, damage)` for every creature hit, in cell order.
    pub hits: Vec<(NetworkId, i32)>,
    pub killed: Vec<NetworkId>,
    pub whiffed: bool,
}

/// Where the target currently is. `None` if it was a creature that is gone.
fn target_location(world: &World, target: &SkillTarget) -> Option<GridPoint> {
    match target.creature {
        Some(id) => world.living(id).map(|c| c.position),
        None => Some(target.location),
    }
}

fn actor_location(world: &World, actor: NetworkId, actor_override: Option<GridPoint>) -> Option<GridPoint> {
    let creature = world.living(actor)?;
    Some(actor_override.unwrap_or(creature.position))
}

pub fn can_use_skill(
    world: &World,
    data: &GameData,
    skill_name: &str,
    actor: NetworkId,
    target: &SkillTarget,
    actor_override: Option<GridPoint>,
) -> bool {
    let Some(skill) = data.skill(skill_name) else {
        return false;
    };
    let Some(creature) = world.living(actor) else {
        return false;
    };
    let Some(from) = actor_location(world, actor, actor_override) else {
        return false;
    };
    let Some(to) = target_location(world, target) else {
        return false;
    };
    if creature.stamina < skill.stamina_cost {
        return false;
    }

    let mut max_range = skill.max_range;
    if skill.has_tag(SkillTag::Melee) && world.has_extended_reach(actor) {
        max_range += 1;
    }
    let distance = from.manhattan_distance(to);
    distance >= skill.min_range && distance <= max_range
}

pub fn resolve_targets(
    world: &World,
    data: &GameData,
    skill_name: &str,
    actor: NetworkId,
    target: &SkillTarget,
    actor_override: Option<GridPoint>,
) -> BTreeSet<GridPoint> {
    let mut cells = BTreeSet::new();
    let (Some(skill), Some(from)) = (data.skill(skill_name), actor_location(world, actor, actor_override)) else {
        return cells;
    };
    let Some(to) = target_location(world, target) else {
        return cells;
    };
    expand(skill, from, to, &mut cells);
    cells
}

/// Add the direct target and every effect cell for a skill used from `from`
/// at `to`.
fn expand(skill: &SkillDef, from: GridPoint, to: GridPoint, cells: &mut BTreeSet<GridPoint>) {
    cells.insert(to);
    let (sx, sy) = from.direction_to(to);
    for effect in &skill.effects {
        match *effect {
            SkillEffect::Cleave => {
                cells.insert(GridPoint::new(to.x + sy, to.y - sx));
                cells.insert(GridPoint::new(to.x - sy, to.y + sx));
            }
            SkillEffect::Aoe { radius } => {
                for dx in -radius..=radius {
                    for dy in -radius..=radius {
                        cells.insert(to.offset(dx, dy));
                    }
                }
            }
            SkillEffect::Pierce { distance } => {
                for i in 1..=distance {
                    cells.insert(to.offset(i * sx, i * sy));
                }
            }
        }
    }
}

/// Damage one hit from `actor` deals with `skill`.
pub fn skill_damage(world: &World, skill: &SkillDef, actor: NetworkId) -> i32 {
    let Some(stats) = world.effective_stats(actor) else {
        return 0;
    };
    let scale = &skill.damage_bonuses;
    skill.damage
        + (scale.str * f64::from(stats.strength)) as i32
        + (scale.dex * f64::from(stats.dexterity)) as i32
        + (scale.int * f64::from(stats.intelligence)) as i32
}

/// Resolve and apply a skill. The actor pays the stamina cost once, whether
/// it hits, misses, or whiffs. A dead or unknown actor does nothing.
pub fn apply_damage(
    world: &mut World,
    data: &GameData,
    skill_name: &str,
    actor: NetworkId,
    target: &SkillTarget,
) -> SkillOutcome {
    let mut outcome = SkillOutcome::default();
    let Some(skill) = data.skill(skill_name) else {
        return outcome;
    };
    if world.living(actor).is_none() {
        return outcome;
    }

    let cells = resolve_targets(world, data, skill_name, actor, target, None);
    if cells.is_empty() {
        outcome.whiffed = true;
        debug!(%actor, skill = skill_name, "skill whiffed, target is gone");
    }

    let damage = skill_damage(world, skill, actor);
    for cell in cells {
        let Some(victim) = world.creature_id_at(cell) else {
            continue;
        };
        let Some(creature) = world.creature_mut(victim) else {
            continue;
        };
        creature.life -= damage;
        let life = creature.life;
        outcome.hits.push((victim, damage));
        debug!(%victim, damage, life, skill = skill_name, "creature hit");
        if life <= 0 && world.remove_creature(victim).is_ok() {
            info!(%victim, %cell, "creature died");
            outcome.killed.push(victim);
        }
    }

    if let Some(creature) = world.creature_mut(actor) {
        creature.stamina -= skill.stamina_cost;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CreatureDef, ItemDef, StatScaling};
    use crate::entity::{Creature, EquipSlot, Item, StatBlock};
    use crate::types::{EQUIPMENT_SLOTS, INVENTORY_SIZE, PixelPoint};

    fn skill(name: &str, min: u32, max: u32, effects: Vec<SkillEffect>, tags: Vec<SkillTag>) -> SkillDef {
        SkillDef {
            name: name.into(),
            min_range: min,
            max_range: max,
            targets_ground: false,
            damage: 4,
            stamina_cost: 2,
            damage_bonuses: StatScaling {
                str: 0.5,
                dex: 0.25,
                int: 0.0,
            },
            effects,
            tags,
        }
    }

    fn test_data() -> GameData {
        GameData::from_defs(
            vec![CreatureDef {
                name: "Dummy".into(),
                stats: StatBlock::default(),
                skills: vec![],
                starting_items: vec![],
            }],
            vec![ItemDef {
                name: "Pike".into(),
                slot: EquipSlot::Weapon,
                skills: vec![],
                requirements: StatBlock::default(),
                bonuses: StatBlock::default(),
                extended_reach: true,
            }],
            vec![
                skill("Basic Attack", 1, 1, vec![], vec![SkillTag::Melee]),
                skill("Cleave", 1, 1, vec![SkillEffect::Cleave], vec![SkillTag::Melee]),
                skill("Blast", 2, 6, vec![SkillEffect::Aoe { radius: 1 }], vec![]),
                skill("Lance", 1, 1, vec![SkillEffect::Pierce { distance: 2 }], vec![SkillTag::Melee]),
                skill(
                    "Whirl",
                    1,
                    1,
                    vec![SkillEffect::Cleave, SkillEffect::Pierce { distance: 1 }],
                    vec![SkillTag::Melee],
                ),
            ],
        )
        .unwrap()
    }

    fn arena() -> World {
        let mut world = World::new(12, 12, 64.0);
        for x in 0..12 {
            for y in 0..12 {
                world.set_tile(GridPoint::new(x, y), "Floor").unwrap();
            }
        }
        world
    }

    fn spawn(world: &mut World, at: GridPoint, life: i32, is_player_team: bool) -> NetworkId {
        let id = world.alloc_id();
        world
            .place_creature(Creature {
                id,
                name: "Dummy".into(),
                position: at,
                pixel: PixelPoint::default(),
                life,
                stamina: 10,
                stats: StatBlock {
                    strength: 6,
                    dexterity: 4,
                    max_life: life,
                    max_stamina: 10,
                    ..StatBlock::default()
                },
                equipment: [None; EQUIPMENT_SLOTS],
                inventory: [None; INVENTORY_SIZE],
                innate_skills: vec!["Basic Attack".into()],
                is_player_team,
                is_activated: false,
                dead: false,
            })
            .unwrap()
    }

    fn pts(list: &[(i32, i32)]) -> BTreeSet<GridPoint> {
        list.iter().map(|&(x, y)| GridPoint::new(x, y)).collect()
    }

    #[test]
    fn cleave_hits_cells_perpendicular_to_attack_axis() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(5, 5), 20, true);
        let foe = spawn(&mut world, GridPoint::new(6, 5), 20, false);
        let target = SkillTarget::creature(foe, GridPoint::new(6, 5));
        let cells = resolve_targets(&world, &data, "Cleave", actor, &target, None);
        assert_eq!(cells, pts(&[(6, 5), (6, 4), (6, 6)]));
    }

    #[test]
    fn cleave_on_vertical_axis() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(5, 5), 20, true);
        let target = SkillTarget::ground(GridPoint::new(5, 4));
        let cells = resolve_targets(&world, &data, "Cleave", actor, &target, None);
        assert_eq!(cells, pts(&[(5, 4), (4, 4), (6, 4)]));
    }

    #[test]
    fn aoe_covers_full_square() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(1, 1), 20, true);
        let target = SkillTarget::ground(GridPoint::new(4, 4));
        let cells = resolve_targets(&world, &data, "Blast", actor, &target, None);
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&GridPoint::new(3, 3)));
        assert!(cells.contains(&GridPoint::new(5, 5)));
    }

    #[test]
    fn pierce_continues_away_from_actor() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(5, 5), 20, true);
        let target = SkillTarget::ground(GridPoint::new(5, 6));
        let cells = resolve_targets(&world, &data, "Lance", actor, &target, None);
        assert_eq!(cells, pts(&[(5, 6), (5, 7), (5, 8)]));
    }

    #[test]
    fn effects_compose_additively() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(5, 5), 20, true);
        let target = SkillTarget::ground(GridPoint::new(4, 5));
        let cells = resolve_targets(&world, &data, "Whirl", actor, &target, None);
        assert_eq!(cells, pts(&[(4, 5), (4, 4), (4, 6), (3, 5)]));
    }

    #[test]
    fn override_location_changes_geometry_and_range() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(1, 5), 20, true);
        let foe = spawn(&mut world, GridPoint::new(6, 5), 20, false);
        let target = SkillTarget::creature(foe, GridPoint::new(6, 5));
        assert!(!can_use_skill(&world, &data, "Cleave", actor, &target, None));
        let after_move = Some(GridPoint::new(6, 6));
        assert!(can_use_skill(&world, &data, "Cleave", actor, &target, after_move));
        let cells = resolve_targets(&world, &data, "Cleave", actor, &target, after_move);
        assert_eq!(cells, pts(&[(6, 5), (5, 5), (7, 5)]));
    }

    #[test]
    fn range_and_stamina_gate() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(2, 2), 20, true);
        let near = SkillTarget::ground(GridPoint::new(3, 2));
        let mid = SkillTarget::ground(GridPoint::new(5, 3));
        let far = SkillTarget::ground(GridPoint::new(9, 9));
        assert!(!can_use_skill(&world, &data, "Blast", actor, &near, None));
        assert!(can_use_skill(&world, &data, "Blast", actor, &mid, None));
        assert!(!can_use_skill(&world, &data, "Blast", actor, &far, None));
        assert!(!can_use_skill(&world, &data, "No Such Skill", actor, &mid, None));

        world.creature_mut(actor).unwrap().stamina = 1;
        assert!(!can_use_skill(&world, &data, "Blast", actor, &mid, None));
    }

    #[test]
    fn extended_reach_only_helps_melee() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(2, 2), 20, true);
        let two_away = SkillTarget::ground(GridPoint::new(4, 2));
        assert!(!can_use_skill(&world, &data, "Basic Attack", actor, &two_away, None));

        let pike = world.alloc_id();
        world
            .give_equipped_item(
                actor,
                Item {
                    id: pike,
                    name: "Pike".into(),
                    slot: EquipSlot::Weapon,
                    position: GridPoint::new(2, 2),
                    on_ground: false,
                    requirements: StatBlock::default(),
                    bonuses: StatBlock::default(),
                    extended_reach: true,
                    skills: vec![],
                },
            )
            .unwrap();
        assert!(can_use_skill(&world, &data, "Basic Attack", actor, &two_away, None));
        let seven_away = SkillTarget::ground(GridPoint::new(9, 2));
        assert!(!can_use_skill(&world, &data, "Blast", actor, &seven_away, None));
    }

    #[test]
    fn damage_scales_with_stats_and_charges_stamina_once() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(5, 5), 20, true);
        let a = spawn(&mut world, GridPoint::new(6, 5), 30, false);
        let b = spawn(&mut world, GridPoint::new(6, 4), 30, false);
        let target = SkillTarget::creature(a, GridPoint::new(6, 5));

        let outcome = apply_damage(&mut world, &data, "Cleave", actor, &target);
        // 4 + trunc(0.5 * 6) + trunc(0.25 * 4) = 8
        assert_eq!(outcome.hits.len(), 2);
        assert!(outcome.hits.iter().all(|&(_, d)| d == 8));
        assert_eq!(world.creature(a).unwrap().life, 22);
        assert_eq!(world.creature(b).unwrap().life, 22);
        assert_eq!(world.creature(actor).unwrap().stamina, 8);
    }

    #[test]
    fn lethal_damage_removes_creature() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(5, 5), 20, true);
        let foe = spawn(&mut world, GridPoint::new(5, 6), 8, false);
        let target = SkillTarget::creature(foe, GridPoint::new(5, 6));
        let outcome = apply_damage(&mut world, &data, "Basic Attack", actor, &target);
        assert_eq!(outcome.killed, vec![foe]);
        assert!(world.creature_at(GridPoint::new(5, 6)).is_none());
        assert!(world.creature(foe).unwrap().dead);
        assert!(world.invariant_violations().is_empty());
    }

    #[test]
    fn dead_target_whiffs_but_costs_stamina() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(5, 5), 20, true);
        let foe = spawn(&mut world, GridPoint::new(6, 5), 20, false);
        let bystander = spawn(&mut world, GridPoint::new(6, 4), 20, false);
        world.remove_creature(foe).unwrap();

        let target = SkillTarget::creature(foe, GridPoint::new(6, 5));
        assert!(resolve_targets(&world, &data, "Cleave", actor, &target, None).is_empty());
        let outcome = apply_damage(&mut world, &data, "Cleave", actor, &target);
        assert!(outcome.whiffed);
        assert!(outcome.hits.is_empty());
        assert_eq!(world.creature(bystander).unwrap().life, 20);
        assert_eq!(world.creature(actor).unwrap().stamina, 8);
    }

    #[test]
    fn dead_actor_does_nothing() {
        let mut world = arena();
        let data = test_data();
        let actor = spawn(&mut world, GridPoint::new(5, 5), 20, true);
        let foe = spawn(&mut world, GridPoint::new(6, 5), 20, false);
        world.remove_creature(actor).unwrap();
        let target = SkillTarget::creature(foe, GridPoint::new(6, 5));
        let outcome = apply_damage(&mut world, &data, "Cleave", actor, &target);
        assert_eq!(outcome, SkillOutcome::default());
        assert_eq!(world.creature(foe).unwrap().life, 20);
    }
}
