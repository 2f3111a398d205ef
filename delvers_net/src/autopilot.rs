// Headless player for the client binary.
//
// Once per players' turn: if any of our skills can hit a living enemy from
// where we stand, use it on the first such enemy (by id); otherwise walk as
// far as our movement allows toward the nearest enemy. Then ready up.
//
// The autopilot acts when the replica says it is the players' turn and we are
// rostered and not yet ready. It re-arms when it sees the turn close (an
// applied `TurnChange(false)`), so a turn that closes and reopens within one
// tick is still counted.

use delvers_sim::event::{Action, MoveEvent, UseSkillEvent};
use delvers_sim::pathfinding::find_path;
use delvers_sim::skill::{SkillTarget, can_use_skill};
use delvers_sim::{Applied, Event, GridPoint, Simulation, Team};
use tracing::info;

use crate::error::NetError;
use crate::game_client::GameClient;

/// What to do this turn.
pub fn plan_turn(sim: &Simulation) -> Vec<Action> {
    let Some(me) = sim.local_creature() else {
        return Vec::new();
    };
    let world = sim.world();
    let Some(creature) = world.living(me) else {
        return Vec::new();
    };
    let enemies: Vec<(delvers_sim::NetworkId, GridPoint)> = world
        .creatures()
        .filter(|c| c.is_alive() && !c.is_player_team)
        .map(|c| (c.id, c.position))
        .collect();

    for skill in world.skills_of(me) {
        for &(id, at) in &enemies {
            let target = SkillTarget::creature(id, at);
            if can_use_skill(world, sim.data(), &skill, me, &target, None) {
                return vec![Action::UseSkill(UseSkillEvent {
                    skill,
                    source: me,
                    target,
                })];
            }
        }
    }

    let nearest = enemies
        .iter()
        .map(|&(_, at)| find_path(world, creature.position, at, Team::Any))
        .filter(|path| !path.is_empty())
        .min_by_key(Vec::len);
    let Some(mut path) = nearest else {
        return Vec::new();
    };
    // Stop short of the enemy and of anyone else standing on the route.
    path.pop();
    if let Some(blocked) = path.iter().skip(1).position(|p| world.creature_id_at(*p).is_some()) {
        path.truncate(blocked + 1);
    }
    let movement = world.effective_stats(me).map_or(0, |s| s.movement.max(0) as usize);
    path.truncate(movement + 1);
    if path.len() < 2 {
        return Vec::new();
    }
    vec![Action::Move(MoveEvent { creature: me, path })]
}

#[derive(Debug, Default)]
pub struct Autopilot {
    submitted: bool,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the events applied this tick and act if it is our move.
    pub fn step(&mut self, client: &GameClient, applied: &[Applied]) -> Result<(), NetError> {
        if applied
            .iter()
            .any(|a| a.event == Event::turn_change(false))
        {
            self.submitted = false;
        }
        if self.submitted {
            return Ok(());
        }
        let sim = client.sim();
        let Some(player) = sim.local_player() else {
            return Ok(());
        };
        let waiting = sim.turn().players_turn && sim.turn().player(player).is_some_and(|t| !t.ready);
        if !waiting {
            return Ok(());
        }

        for action in plan_turn(sim) {
            info!(%player, ?action, "autopilot acting");
            client.propose(action)?;
        }
        client.ready()?;
        self.submitted = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delvers_sim::{PlayerId, Role, WorldSnapshot};

    fn replica_with(snapshot: WorldSnapshot, spawn: GridPoint) -> Simulation {
        let mut sim = Simulation::with_defaults(Role::Client);
        sim.admit([
            Event::game_start(snapshot),
            Event::set_player(PlayerId(1)),
            Event::new_player(PlayerId(1), spawn),
        ]);
        assert!(sim.run_until_idle(100));
        sim
    }

    #[test]
    fn walks_toward_distant_enemy() {
        let sim = replica_with(WorldSnapshot::arena(24, 16, GridPoint::new(5, 1)), GridPoint::new(6, 4));
        let plan = plan_turn(&sim);
        assert_eq!(plan.len(), 1);
        let Action::Move(mv) = &plan[0] else {
            panic!("expected a move, got {:?}", plan[0]);
        };
        assert_eq!(mv.path[0], GridPoint::new(6, 4));
        let movement = sim
            .world()
            .effective_stats(mv.creature)
            .unwrap()
            .movement as usize;
        assert_eq!(mv.path.len(), movement + 1);
        assert!(crate::game_client::action_is_plausible(&sim, &plan[0]));
    }

    #[test]
    fn attacks_adjacent_enemy() {
        let mut snapshot = WorldSnapshot::empty_room(10, 10, GridPoint::new(1, 1));
        snapshot.creatures.push(delvers_sim::snapshot::Placement {
            name: "Goblin".into(),
            at: GridPoint::new(5, 5),
        });
        let sim = replica_with(snapshot, GridPoint::new(4, 5));
        let plan = plan_turn(&sim);
        let [Action::UseSkill(hit)] = plan.as_slice() else {
            panic!("expected one skill use, got {plan:?}");
        };
        assert_eq!(hit.target.location, GridPoint::new(5, 5));
    }

    #[test]
    fn no_enemies_means_no_plan() {
        let sim = replica_with(WorldSnapshot::empty_room(10, 10, GridPoint::new(1, 1)), GridPoint::new(4, 5));
        assert!(plan_turn(&sim).is_empty());
    }
}
