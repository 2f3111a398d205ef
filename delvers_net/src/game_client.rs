// A networked player: client-role `Simulation` plus its server connection.
//
// `GameClient` is what a frontend (or the headless autopilot, or a test)
// drives. Each `tick()` steps the local replica, then admits every message
// received since the last tick. Player intent goes out through `propose`,
// `ready`, and `reset`. Nothing is applied locally on send; the server echoes
// our own messages back in order with everyone else's, and that echo is what
// the replica applies.
//
// `propose` screens actions before sending so obviously bad input never
// reaches the wire: it must be our creature, it must be the players' turn, a
// move must be a contiguous walkable path within our movement, and a skill
// must pass `can_use_skill`. The batch applies our move before our other
// action, so skills and pickups are judged from where a queued move ends. The replica would turn a bad action into a
// logged no-op anyway; the screen just keeps the journal clean.
//
// See also: `client.rs` for the transport, `autopilot.rs` for a headless
// player built on this.

use std::net::ToSocketAddrs;

use delvers_protocol::PlayerId;
use delvers_sim::codec::{decode_events, message_from_events};
use delvers_sim::event::{Action, MoveEvent, ResetPlayerActionsEvent};
use delvers_sim::skill::can_use_skill;
use delvers_sim::{Applied, Event, GridPoint, NetworkId, Role, Simulation};
use tracing::{debug, warn};

use crate::client::{ClientConfig, NetClient};
use crate::error::NetError;

pub struct GameClient {
    sim: Simulation,
    net: NetClient,
}

impl GameClient {
    /// Connect and send the join request. The replica fills in as the
    /// server's journal arrives.
    pub fn connect(addr: impl ToSocketAddrs, config: ClientConfig) -> Result<Self, NetError> {
        let net = NetClient::connect(addr, config)?;
        net.join()?;
        Ok(Self {
            sim: Simulation::with_defaults(Role::Client),
            net,
        })
    }

    /// Use a specific replica (custom config or game data). It must match
    /// the server's.
    pub fn with_simulation(sim: Simulation, net: NetClient) -> Result<Self, NetError> {
        net.join()?;
        Ok(Self { sim, net })
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn player(&self) -> Option<PlayerId> {
        self.sim.local_player()
    }

    pub fn creature(&self) -> Option<NetworkId> {
        self.sim.local_creature()
    }

    /// Step the replica, then admit what arrived. Returns the events the
    /// replica finished applying this tick.
    pub fn tick(&mut self) -> Result<Vec<Applied>, NetError> {
        self.sim.tick();
        let applied = self.sim.drain_notifications();
        for message in self.net.poll()? {
            match decode_events(&message.records) {
                Ok(events) => self.sim.admit(events),
                Err(e) => warn!(sender = %message.sender, error = %e, "dropping undecodable message"),
            }
        }
        Ok(applied)
    }

    /// Queue an action for this turn. Returns `Ok(false)` without sending if
    /// the action fails the local screen.
    pub fn propose(&self, action: Action) -> Result<bool, NetError> {
        let Some(player) = self.player() else {
            return Ok(false);
        };
        if !action_is_plausible(&self.sim, &action) {
            debug!(?action, "action rejected locally");
            return Ok(false);
        }
        self.send(&[Event::player_action(player, action)])?;
        Ok(true)
    }

    pub fn ready(&self) -> Result<(), NetError> {
        self.send_as_player(|player| Event::player_ready(player, true))
    }

    pub fn unready(&self) -> Result<(), NetError> {
        self.send_as_player(|player| Event::player_ready(player, false))
    }

    /// Clear this turn's queued actions.
    pub fn reset(&self) -> Result<(), NetError> {
        self.send_as_player(|player| Event::ResetPlayerActions(ResetPlayerActionsEvent { player }))
    }

    fn send_as_player(&self, event: impl FnOnce(PlayerId) -> Event) -> Result<(), NetError> {
        match self.player() {
            Some(player) => self.send(&[event(player)]),
            None => {
                debug!("not joined yet, nothing sent");
                Ok(())
            }
        }
    }

    fn send(&self, events: &[Event]) -> Result<(), NetError> {
        let player = self.player().unwrap_or(PlayerId::HOST);
        let message = message_from_events(player, events)?;
        self.net.send(&message)
    }

    pub fn disconnect(self) {
        self.net.disconnect();
    }
}

/// Cheap local screen for a proposed action.
pub fn action_is_plausible(sim: &Simulation, action: &Action) -> bool {
    let Some(me) = sim.local_creature() else {
        return false;
    };
    if !sim.turn().players_turn || action.actor() != me {
        return false;
    }
    let world = sim.world();
    let Some(creature) = world.living(me) else {
        return false;
    };
    let after_move = pending_move_end(sim);
    match action {
        Action::Move(mv) => path_is_plausible(sim, mv, creature.position),
        Action::UseSkill(e) => can_use_skill(world, sim.data(), &e.skill, me, &e.target, after_move),
        Action::PickupItem(e) => {
            let from = after_move.unwrap_or(creature.position);
            world
                .item(e.item)
                .is_some_and(|item| item.on_ground && item.position.manhattan_distance(from) <= 1)
        }
        Action::EquipItem(e) => creature.inventory.get(e.inventory_slot).is_some_and(Option::is_some),
        Action::UnequipItem(e) => creature.equipment[e.equip_slot.index()].is_some(),
    }
}

/// Where our queued move for this turn ends, if one is queued.
fn pending_move_end(sim: &Simulation) -> Option<GridPoint> {
    let player = sim.local_player()?;
    match sim.turn().player(player)?.move_slot.as_ref()? {
        Action::Move(mv) => mv.path.last().copied(),
        _ => None,
    }
}

fn path_is_plausible(sim: &Simulation, mv: &MoveEvent, from: GridPoint) -> bool {
    let world = sim.world();
    let movement = world
        .effective_stats(mv.creature)
        .map_or(0, |s| s.movement.max(0) as usize);
    mv.path.len() >= 2
        && mv.path.len() - 1 <= movement
        && mv.path[0] == from
        && mv.path
            .windows(2)
            .all(|w| w[0].manhattan_distance(w[1]) == 1 && world.tile_at(w[1]).is_some())
}
