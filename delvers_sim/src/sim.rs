// The simulation context: one replica of the game.
//
// `Simulation` owns everything a replica needs (config, game data, the
// `World`, the turn state machine, and the event log) and is the only thing
// that mutates them. Server and clients each hold one; they differ only in
// `Role`, which decides whether `EnemyTurn` plans enemy actions.
//
// ## Tick
//
// `tick()` runs one fixed simulation step:
//
//   1. Drain the active queue from the front. Each event is applied; a
//      completed event moves to history and the next one is tried in the same
//      tick. The first event that is not finished (a Move in transit) stays at
//      the head and the drain stops. The drain also stops right after any
//      event that leaves the turn barrier satisfied.
//   2. If the barrier is satisfied, close the turn and splice the batch onto
//      the front of the queue.
//
// The driver (see the net crate) then admits freshly received events with
// `admit()`, which appends them to the queue and to the journal.
//
// Stopping the drain at the barrier means the end-of-turn batch always lands
// directly after the event that completed the barrier, whatever else was
// queued behind it. That makes the batch's position a function of the event
// order alone, so a replica replaying the journal in one burst derives it at
// the same place as one that received events over many ticks.
//
// ## Roles
//
// Both roles run the whole state machine. On `EnemyTurn` every replica runs
// the activation pass; the server then plans the enemies' actions and parks
// them, plus `TurnChange(true)`, in `outbound`. The driver sends them through
// the server mailbox like any client message, so they reach every replica
// (the server included) via `admit`.
//
// ## Events that are not valid
//
// Application never fails. An event that cannot apply (unknown creature, out
// of range, full inventory, ...) is logged at `warn` and completes as a no-op.
//
// See also: `event.rs`, `event_log.rs`, `turn.rs`, `ai.rs`, `skill.rs`,
// `world.rs`.
//
// **Critical constraint: determinism.** Everything here must depend only on
// the sequence of applied events. No wall clock, no randomness, no hash-order
// iteration.

use tracing::{debug, info, warn};

use crate::ai;
use crate::codec::event_name;
use crate::config::SimConfig;
use crate::data::{BASIC_ATTACK, GameData};
use crate::entity::{Creature, Item};
use crate::event::{
    EquipItemEvent, Event, GameStartEvent, MoveEvent, NewPlayerEvent, PickupItemEvent,
    UnequipItemEvent, UseSkillEvent,
};
use crate::event_log::{ActiveEvent, EventLog};
use crate::skill::{self, can_use_skill};
use crate::turn::TurnState;
use crate::types::{EQUIPMENT_SLOTS, GridPoint, INVENTORY_SIZE, NetworkId, PixelPoint, PlayerId};
use crate::world::World;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Authoritative host: plans enemy turns.
    Server,
    Client,
}

/// An event this replica finished applying, for whoever renders the game.
#[derive(Clone, Debug, PartialEq)]
pub struct Applied {
    pub event: Event,
    pub completed_at_tick: u64,
}

pub struct Simulation {
    config: SimConfig,
    data: GameData,
    world: World,
    turn: TurnState,
    log: EventLog,
    role: Role,
    local_player: Option<PlayerId>,
    started: bool,
    tick_count: u64,
    notifications: Vec<Applied>,
    outbound: Vec<Event>,
}

impl Simulation {
    pub fn new(role: Role, config: SimConfig, data: GameData) -> Self {
        Self {
            world: World::new(0, 0, config.tile_size),
            config,
            data,
            turn: TurnState::default(),
            log: EventLog::default(),
            role,
            local_player: None,
            started: false,
            tick_count: 0,
            notifications: Vec::new(),
            outbound: Vec::new(),
        }
    }

    pub fn with_defaults(role: Role) -> Self {
        Self::new(role, SimConfig::default(), GameData::default())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn data(&self) -> &GameData {
        &self.data
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn local_player(&self) -> Option<PlayerId> {
        self.local_player
    }

    pub fn local_creature(&self) -> Option<NetworkId> {
        self.local_player
            .and_then(|p| self.world.player_creature(p))
    }

    pub fn journal(&self) -> &[Event] {
        self.log.journal()
    }

    pub fn history(&self) -> &[Event] {
        self.log.history()
    }

    pub fn pending(&self) -> usize {
        self.log.active_len()
    }

    /// Nothing queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.log.active_len() == 0
    }

    // -----------------------------------------------------------------------
    // Driver interface
    // -----------------------------------------------------------------------

    /// Queue events received from the network.
    pub fn admit(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.log.admit(event);
        }
    }

    /// Events this replica wants broadcast (server role only).
    pub fn take_outbound(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbound)
    }

    pub fn drain_notifications(&mut self) -> Vec<Applied> {
        std::mem::take(&mut self.notifications)
    }

    pub fn tick(&mut self) {
        self.tick_count += 1;

        while let Some(mut entry) = self.log.pop_front() {
            if !self.apply(&mut entry) {
                self.log.requeue(entry);
                break;
            }
            self.notifications.push(Applied {
                event: entry.event.clone(),
                completed_at_tick: self.tick_count,
            });
            self.log.complete(entry.event);
            if self.turn.barrier_satisfied() {
                break;
            }
        }

        if self.turn.barrier_satisfied() {
            let batch = self.turn.close_turn();
            info!(tick = self.tick_count, actions = batch.len() - 2, "players' turn closed");
            self.log.splice_front(batch);
        }
    }

    /// Tick until the queue is empty or `max_ticks` have run. Returns whether
    /// the queue emptied.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            if self.is_idle() {
                return true;
            }
            self.tick();
        }
        self.is_idle()
    }

    // -----------------------------------------------------------------------
    // Event application
    // -----------------------------------------------------------------------

    /// Apply one event. Returns whether it has completed.
    fn apply(&mut self, entry: &mut ActiveEvent) -> bool {
        debug!(tick = self.tick_count, event = event_name(&entry.event), "applying");
        match &mut entry.event {
            Event::GameStart(e) => self.apply_game_start(e),
            Event::SetPlayer(e) => {
                self.local_player = Some(e.player);
                info!(player = %e.player, "assigned local player");
            }
            Event::NewPlayer(e) => self.apply_new_player(e),
            Event::PlayerAction(e) => {
                let actor = e.action.actor();
                if self.world.player_creature(e.player) != Some(actor) {
                    warn!(player = %e.player, %actor, "action for a creature the player does not control");
                } else if !self.turn.set_action(e.player, e.action.clone()) {
                    warn!(player = %e.player, "action from player not in roster");
                }
            }
            Event::PlayerReady(e) => {
                if !self.turn.set_ready(e.player, e.ready) {
                    warn!(player = %e.player, "ready from player not in roster");
                }
            }
            Event::ResetPlayerActions(e) => {
                if !self.turn.reset_actions(e.player) {
                    warn!(player = %e.player, "reset from player not in roster");
                }
            }
            Event::TurnChange(e) => self.apply_turn_change(e.players_turn),
            Event::Move(e) => {
                let waypoint = &mut entry.waypoint;
                return self.step_move(e, waypoint);
            }
            Event::UseSkill(e) => self.apply_use_skill(e),
            Event::PickupItem(e) => self.apply_pickup(e),
            Event::EquipItem(e) => self.apply_equip(e),
            Event::UnequipItem(e) => self.apply_unequip(e),
            Event::EnemyTurn => self.apply_enemy_turn(),
            Event::PlayerLeft(e) => {
                if self.turn.leave(e.player) {
                    info!(player = %e.player, "player left");
                }
            }
        }
        true
    }

    fn apply_game_start(&mut self, e: &GameStartEvent) {
        if self.started {
            warn!("duplicate GameStart ignored");
            return;
        }
        let snap = &e.snapshot;
        let mut world = World::new(snap.width, snap.height, self.config.tile_size);
        world.start = snap.start;
        for tile in &snap.tiles {
            if let Err(err) = world.set_tile(tile.at, &tile.name) {
                warn!(%err, "skipping snapshot tile");
            }
        }
        self.world = world;
        for placement in &snap.creatures {
            self.spawn_creature(&placement.name, placement.at, false);
        }
        for placement in &snap.items {
            let id = self.world.alloc_id();
            let Some(item) = self.instantiate_item(&placement.name, id, placement.at) else {
                warn!(item = %placement.name, "unknown item in snapshot");
                continue;
            };
            if let Err(err) = self.world.place_ground_item(item) {
                warn!(%err, item = %placement.name, "skipping snapshot item");
            }
        }
        self.started = true;
        info!(
            width = snap.width,
            height = snap.height,
            creatures = snap.creatures.len(),
            "game started"
        );
    }

    fn apply_new_player(&mut self, e: &NewPlayerEvent) {
        if self.world.player_creature(e.player).is_some() {
            warn!(player = %e.player, "duplicate NewPlayer ignored");
            return;
        }
        let Some(at) = self.world.nearest_free_tile(e.spawn) else {
            warn!(player = %e.player, spawn = %e.spawn, "no free tile to spawn player");
            return;
        };
        let name = self.config.player_creature.clone();
        let Some(id) = self.spawn_creature(&name, at, true) else {
            return;
        };
        self.world.register_player(e.player, id);
        self.turn.join(e.player);
        info!(player = %e.player, creature = %id, %at, "player joined");
    }

    fn apply_turn_change(&mut self, players_turn: bool) {
        self.turn.players_turn = players_turn;
        let regen: Vec<(NetworkId, i32, i32)> = self
            .world
            .creatures()
            .filter(|c| c.is_alive() && c.is_player_team == players_turn)
            .filter_map(|c| {
                let stats = self.world.effective_stats(c.id)?;
                Some((c.id, stats.stamina_regen, stats.max_stamina))
            })
            .collect();
        for (id, amount, cap) in regen {
            if let Some(c) = self.world.creature_mut(id) {
                if c.stamina < cap {
                    c.stamina = (c.stamina + amount).min(cap);
                }
            }
        }
        info!(players_turn, "turn changed");
    }

    /// Advance a Move by one tick. `waypoint` is the index of the last path
    /// point the creature reached.
    fn step_move(&mut self, e: &mut MoveEvent, waypoint: &mut usize) -> bool {
        let id = e.creature;
        let Some(creature) = self.world.living(id) else {
            debug!(creature = %id, "move by dead or unknown creature");
            return true;
        };
        if e.path.len() < 2 {
            return true;
        }
        if e.path[0] != creature.position {
            warn!(creature = %id, at = %creature.position, from = %e.path[0], "move does not start at creature");
            return true;
        }

        // Cut the remaining route before anything now in the way.
        let blocked = (*waypoint + 1..e.path.len()).find(|&i| {
            let p = e.path[i];
            p.manhattan_distance(e.path[i - 1]) != 1
                || self.world.tile_at(p).is_none()
                || self.world.creature_id_at(p).is_some_and(|other| other != id)
        });
        if let Some(i) = blocked {
            debug!(creature = %id, at = %e.path[i], "path truncated");
            e.path.truncate(i);
        }
        if *waypoint + 1 >= e.path.len() {
            return self.finish_move(id, e.path[*waypoint]);
        }

        let target = e.path[*waypoint + 1].to_pixels(self.world.tile_size);
        let speed = self.config.move_speed_px;
        let epsilon = self.config.snap_epsilon_px;
        let Some(c) = self.world.creature_mut(id) else {
            return true;
        };
        c.pixel = PixelPoint {
            x: approach(c.pixel.x, target.x, speed),
            y: approach(c.pixel.y, target.y, speed),
        };
        if (c.pixel.x - target.x).abs() <= epsilon && (c.pixel.y - target.y).abs() <= epsilon {
            c.pixel = target;
            *waypoint += 1;
            if *waypoint + 1 == e.path.len() {
                return self.finish_move(id, e.path[*waypoint]);
            }
        }
        false
    }

    fn finish_move(&mut self, id: NetworkId, to: GridPoint) -> bool {
        match self.world.relocate_creature(id, to) {
            Ok(()) => debug!(creature = %id, %to, "move finished"),
            Err(err) => warn!(creature = %id, %err, "move could not land"),
        }
        true
    }

    fn apply_use_skill(&mut self, e: &UseSkillEvent) {
        if !self.world.skills_of(e.source).contains(&e.skill) {
            warn!(creature = %e.source, skill = %e.skill, "creature does not have skill");
            return;
        }
        let usable = can_use_skill(&self.world, &self.data, &e.skill, e.source, &e.target, None);
        let target_died = e
            .target
            .creature
            .and_then(|id| self.world.creature(id))
            .is_some_and(|c| c.dead);
        let can_pay = match (self.world.living(e.source), self.data.skill(&e.skill)) {
            (Some(c), Some(s)) => c.stamina >= s.stamina_cost,
            _ => false,
        };
        if usable || (target_died && can_pay) {
            let outcome = skill::apply_damage(&mut self.world, &self.data, &e.skill, e.source, &e.target);
            debug!(
                creature = %e.source,
                skill = %e.skill,
                hits = outcome.hits.len(),
                killed = outcome.killed.len(),
                "skill used"
            );
        } else {
            warn!(creature = %e.source, skill = %e.skill, "skill not usable");
        }
    }

    fn apply_pickup(&mut self, e: &PickupItemEvent) {
        let (Some(item), Some(creature)) = (self.world.item(e.item), self.world.living(e.creature)) else {
            warn!(item = %e.item, creature = %e.creature, "pickup with unknown item or creature");
            return;
        };
        if item.position.manhattan_distance(creature.position) > 1 {
            warn!(item = %e.item, creature = %e.creature, "item out of reach");
            return;
        }
        match self.world.pick_item(e.item, e.creature) {
            Ok(slot) => debug!(item = %e.item, creature = %e.creature, slot, "item picked up"),
            Err(err) => warn!(%err, "pickup failed"),
        }
    }

    fn apply_equip(&mut self, e: &EquipItemEvent) {
        let item = self
            .world
            .creature(e.creature)
            .and_then(|c| c.inventory.get(e.inventory_slot).copied().flatten())
            .and_then(|id| self.world.item(id));
        let Some(item) = item else {
            warn!(creature = %e.creature, slot = e.inventory_slot, "nothing to equip");
            return;
        };
        let meets = self
            .world
            .effective_stats(e.creature)
            .is_some_and(|s| s.meets(&item.requirements));
        if !meets {
            warn!(creature = %e.creature, item = %item.name, "requirements not met");
            return;
        }
        if let Err(err) = self.world.equip(e.creature, e.inventory_slot) {
            warn!(%err, "equip failed");
        }
    }

    fn apply_unequip(&mut self, e: &UnequipItemEvent) {
        if let Err(err) = self.world.unequip(e.creature, e.equip_slot) {
            warn!(%err, "unequip failed");
        }
    }

    fn apply_enemy_turn(&mut self) {
        let woken = ai::activate_enemies(&mut self.world, &self.config);
        if self.role != Role::Server {
            return;
        }
        let mut plan = ai::plan_enemy_turn(&self.world, &self.data);
        debug!(woken = woken.len(), events = plan.len(), "enemy turn planned");
        plan.push(Event::turn_change(true));
        self.outbound.extend(plan);
    }

    // -----------------------------------------------------------------------
    // Spawning
    // -----------------------------------------------------------------------

    fn instantiate_item(&self, name: &str, id: NetworkId, at: GridPoint) -> Option<Item> {
        let def = self.data.item(name)?;
        Some(Item {
            id,
            name: def.name.clone(),
            slot: def.slot,
            position: at,
            on_ground: false,
            requirements: def.requirements,
            bonuses: def.bonuses,
            extended_reach: def.extended_reach,
            skills: def.skills.clone(),
        })
    }

    /// Create a creature from its definition, equip its starting items, and
    /// fill life and stamina to the resulting maxima.
    fn spawn_creature(&mut self, name: &str, at: GridPoint, is_player_team: bool) -> Option<NetworkId> {
        let Some(def) = self.data.creature(name).cloned() else {
            warn!(creature = name, "unknown creature definition");
            return None;
        };
        let mut innate_skills = vec![BASIC_ATTACK.to_string()];
        innate_skills.extend(def.skills.iter().filter(|s| *s != BASIC_ATTACK).cloned());

        let id = self.world.alloc_id();
        let creature = Creature {
            id,
            name: def.name.clone(),
            position: at,
            pixel: PixelPoint::default(),
            life: def.stats.max_life,
            stamina: def.stats.max_stamina,
            stats: def.stats,
            equipment: [None; EQUIPMENT_SLOTS],
            inventory: [None; INVENTORY_SIZE],
            innate_skills,
            is_player_team,
            is_activated: false,
            dead: false,
        };
        if let Err(err) = self.world.place_creature(creature) {
            warn!(%err, creature = name, "could not place creature");
            return None;
        }

        for item_name in &def.starting_items {
            let item_id = self.world.alloc_id();
            let Some(item) = self.instantiate_item(item_name, item_id, at) else {
                continue;
            };
            if let Err(err) = self.world.give_equipped_item(id, item) {
                warn!(%err, item = %item_name, "could not give starting item");
            }
        }
        if let Some(stats) = self.world.effective_stats(id) {
            if let Some(c) = self.world.creature_mut(id) {
                c.life = stats.max_life;
                c.stamina = stats.max_stamina;
            }
        }
        debug!(creature = %id, name, %at, "creature spawned");
        Some(id)
    }
}

/// Move `from` toward `to` by at most `step`.
fn approach(from: f32, to: f32, step: f32) -> f32 {
    if (to - from).abs() <= step {
        to
    } else {
        from + step * (to - from).signum()
    }
}
