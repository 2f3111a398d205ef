// Replica convergence tests.
//
// A server-role `Simulation` is driven the way the net crate drives it: each
// tick its outbound events are fed back through `admit`, as if they had gone
// through the mailbox. Clients then see the server's journal, either all at
// once (a late joiner) or a slice at a time (a connected client), and must end
// up with an identical world.

use delvers_sim::event::{
    Action, EquipItemEvent, MoveEvent, PickupItemEvent, UseSkillEvent,
};
use delvers_sim::skill::{SkillTarget, can_use_skill};
use delvers_sim::{Event, GridPoint, NetworkId, PlayerId, Role, Simulation, WorldSnapshot};

const START: GridPoint = GridPoint::new(3, 2);

fn snapshot() -> WorldSnapshot {
    WorldSnapshot::arena(14, 10, START)
}

/// One server tick plus mailbox loopback.
fn server_tick(server: &mut Simulation) {
    server.tick();
    let out = server.take_outbound();
    if !out.is_empty() {
        server.admit(out);
    }
}

fn settle(server: &mut Simulation) {
    for _ in 0..10_000 {
        if server.is_idle() {
            return;
        }
        server_tick(server);
    }
    panic!("server never went idle");
}

fn spawn_point(player: u32) -> GridPoint {
    START.offset(player as i32, 3)
}

fn creature_of(sim: &Simulation, player: u32) -> NetworkId {
    sim.world().player_creature(PlayerId(player)).unwrap()
}

fn path(points: &[(i32, i32)]) -> Vec<GridPoint> {
    points.iter().map(|&(x, y)| GridPoint::new(x, y)).collect()
}

fn act(player: u32, action: Action) -> Event {
    Event::player_action(PlayerId(player), action)
}

fn ready(player: u32) -> Event {
    Event::player_ready(PlayerId(player), true)
}

/// A melee swing at any enemy in reach, if there is one.
fn swing_at_neighbour(sim: &Simulation, player: u32) -> Option<Action> {
    let me = creature_of(sim, player);
    let world = sim.world();
    world
        .creatures()
        .filter(|c| c.is_alive() && !c.is_player_team)
        .map(|c| SkillTarget::creature(c.id, c.position))
        .find(|t| can_use_skill(world, sim.data(), "Basic Attack", me, t, None))
        .map(|target| {
            Action::UseSkill(UseSkillEvent {
                skill: "Basic Attack".into(),
                source: me,
                target,
            })
        })
}

/// Three full rounds with two players. Returns the server afterwards.
fn play_three_rounds() -> Simulation {
    let mut server = Simulation::with_defaults(Role::Server);
    server.admit([
        Event::game_start(snapshot()),
        Event::new_player(PlayerId(1), spawn_point(1)),
        Event::new_player(PlayerId(2), spawn_point(2)),
    ]);
    settle(&mut server);

    let p1 = creature_of(&server, 1);
    let p2 = creature_of(&server, 2);
    let loot = START.offset(1, 2);
    let staff = server
        .world()
        .items_at(loot)
        .iter()
        .copied()
        .find(|i| server.world().item(*i).unwrap().name == "Sapphire Staff")
        .unwrap();

    // Round 1: P1 grabs the staff, P2 heads east.
    server.admit([
        act(
            1,
            Action::PickupItem(PickupItemEvent {
                item: staff,
                creature: p1,
            }),
        ),
        act(
            2,
            Action::Move(MoveEvent {
                creature: p2,
                path: path(&[(5, 5), (6, 5), (7, 5), (8, 5)]),
            }),
        ),
        ready(1),
    ]);
    settle(&mut server);
    assert!(server.turn().players_turn);
    server.admit([ready(2)]);
    settle(&mut server);
    assert!(server.turn().players_turn, "enemy turn must hand back");

    // Round 2: P1 equips, P2 swings if anything came close.
    let mut round = vec![act(
        1,
        Action::EquipItem(EquipItemEvent {
            creature: p1,
            inventory_slot: 0,
        }),
    )];
    if let Some(swing) = swing_at_neighbour(&server, 2) {
        round.push(act(2, swing));
    }
    round.extend([ready(2), ready(1)]);
    server.admit(round);
    settle(&mut server);

    // Round 3: whatever is adjacent gets hit.
    let mut round = Vec::new();
    for player in [1, 2] {
        if let Some(swing) = swing_at_neighbour(&server, player) {
            round.push(act(player, swing));
        }
        round.push(ready(player));
    }
    server.admit(round);
    settle(&mut server);
    server
}

#[test]
fn journal_replay_reproduces_server_world() {
    let server = play_three_rounds();
    assert!(server.world().invariant_violations().is_empty());

    let mut joiner = Simulation::with_defaults(Role::Client);
    joiner.admit(server.journal().iter().cloned());
    assert!(joiner.run_until_idle(10_000));

    assert_eq!(joiner.world(), server.world());
    assert_eq!(joiner.turn(), server.turn());
    assert!(joiner.take_outbound().is_empty());
}

#[test]
fn incremental_delivery_matches_burst_replay() {
    let mut server = Simulation::with_defaults(Role::Server);
    let mut live = Simulation::with_defaults(Role::Client);
    let mut delivered = 0;

    let script: Vec<Vec<Event>> = vec![
        vec![Event::game_start(snapshot())],
        vec![Event::new_player(PlayerId(1), spawn_point(1))],
        vec![ready(1)],
        vec![],
        vec![ready(1)],
    ];
    for batch in script {
        server.admit(batch);
        for _ in 0..400 {
            server_tick(&mut server);
            let fresh = &server.journal()[delivered..];
            delivered += fresh.len();
            live.admit(fresh.iter().cloned());
            live.tick();
        }
    }
    assert!(live.run_until_idle(10_000));
    settle(&mut server);

    let mut burst = Simulation::with_defaults(Role::Client);
    burst.admit(server.journal().iter().cloned());
    assert!(burst.run_until_idle(10_000));

    assert_eq!(live.world(), server.world());
    assert_eq!(burst.world(), server.world());
}

#[test]
fn contested_pickup_goes_to_lower_player_id() {
    let mut server = Simulation::with_defaults(Role::Server);
    server.admit([
        Event::game_start(snapshot()),
        Event::new_player(PlayerId(1), spawn_point(1)),
        Event::new_player(PlayerId(2), spawn_point(2)),
    ]);
    settle(&mut server);
    let p1 = creature_of(&server, 1);
    let p2 = creature_of(&server, 2);
    let loot = START.offset(1, 2);
    let item = server.world().items_at(loot)[0];

    // P2 stands at (5,5); step next to the pile first.
    server.admit([
        act(
            2,
            Action::Move(MoveEvent {
                creature: p2,
                path: path(&[(5, 5), (5, 4)]),
            }),
        ),
        ready(1),
        ready(2),
    ]);
    settle(&mut server);
    assert_eq!(server.world().creature(p2).unwrap().position, GridPoint::new(5, 4));

    server.admit([
        act(2, Action::PickupItem(PickupItemEvent { item, creature: p2 })),
        act(1, Action::PickupItem(PickupItemEvent { item, creature: p1 })),
        ready(2),
        ready(1),
    ]);
    settle(&mut server);

    let world = server.world();
    assert_eq!(world.creature(p1).unwrap().inventory[0], Some(item));
    assert!(world.creature(p2).unwrap().inventory.iter().all(Option::is_none));
    assert!(!world.items_at(loot).contains(&item));
    assert!(world.invariant_violations().is_empty());
}

#[test]
fn enemies_close_in_over_turns() {
    let mut server = Simulation::with_defaults(Role::Server);
    server.admit([
        Event::game_start(snapshot()),
        Event::new_player(PlayerId(1), spawn_point(1)),
    ]);
    settle(&mut server);
    let hero = creature_of(&server, 1);
    let hero_at = server.world().creature(hero).unwrap().position;

    let goblin = server
        .world()
        .creatures()
        .find(|c| c.name == "Goblin")
        .map(|c| c.id)
        .unwrap();
    let before = server
        .world()
        .creature(goblin)
        .unwrap()
        .position
        .manhattan_distance(hero_at);

    server.admit([ready(1)]);
    settle(&mut server);

    let goblin_now = server.world().creature(goblin).unwrap();
    assert!(goblin_now.is_activated);
    assert!(goblin_now.position.manhattan_distance(hero_at) < before);
    assert!(server.turn().players_turn);
}
