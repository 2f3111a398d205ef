// Turn state machine: the players' turn barrier.
//
// During the players' turn each rostered player queues up to two actions (one
// Move-class, one other) and then marks themselves ready. Once every rostered
// player is ready the turn closes: `close_turn` emits the whole turn as one
// ordered batch of events and flips to the enemies' turn so the barrier cannot
// fire again until a `TurnChange(true)` arrives.
//
// Batch order is fixed: players by ascending `PlayerId`, each player's Move
// action before their other action, then `TurnChange(false)`, then
// `EnemyTurn`. All replicas hold the same roster and slots (they are only
// touched by replicated events), so they all build the same batch.
//
// A player enters the roster on `NewPlayer` and leaves on `PlayerLeft`. An
// empty roster never satisfies the barrier.
//
// See also: `sim.rs` which applies the slot/ready events and splices the
// batch into the active queue, `ai.rs` for what `EnemyTurn` does.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::{Action, Event};
use crate::types::PlayerId;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTurn {
    pub ready: bool,
    pub move_slot: Option<Action>,
    pub other_slot: Option<Action>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub players_turn: bool,
    roster: BTreeMap<PlayerId, PlayerTurn>,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            players_turn: true,
            roster: BTreeMap::new(),
        }
    }
}

impl TurnState {
    pub fn join(&mut self, player: PlayerId) {
        self.roster.entry(player).or_default();
    }

    pub fn leave(&mut self, player: PlayerId) -> bool {
        self.roster.remove(&player).is_some()
    }

    pub fn is_rostered(&self, player: PlayerId) -> bool {
        self.roster.contains_key(&player)
    }

    pub fn player(&self, player: PlayerId) -> Option<&PlayerTurn> {
        self.roster.get(&player)
    }

    pub fn roster(&self) -> impl Iterator<Item = (PlayerId, &PlayerTurn)> {
        self.roster.iter().map(|(p, t)| (*p, t))
    }

    /// Store `action` in the matching slot, replacing what was there.
    /// Returns false if the player is not in the roster.
    pub fn set_action(&mut self, player: PlayerId, action: Action) -> bool {
        let Some(turn) = self.roster.get_mut(&player) else {
            return false;
        };
        if action.is_move() {
            turn.move_slot = Some(action);
        } else {
            turn.other_slot = Some(action);
        }
        true
    }

    pub fn set_ready(&mut self, player: PlayerId, ready: bool) -> bool {
        match self.roster.get_mut(&player) {
            Some(turn) => {
                turn.ready = ready;
                true
            }
            None => false,
        }
    }

    pub fn reset_actions(&mut self, player: PlayerId) -> bool {
        match self.roster.get_mut(&player) {
            Some(turn) => {
                turn.move_slot = None;
                turn.other_slot = None;
                true
            }
            None => false,
        }
    }

    pub fn barrier_satisfied(&self) -> bool {
        self.players_turn && !self.roster.is_empty() && self.roster.values().all(|t| t.ready)
    }

    /// Drain every slot into the end-of-turn batch and switch to the enemies'
    /// turn.
    pub fn close_turn(&mut self) -> Vec<Event> {
        let mut batch = Vec::new();
        for turn in self.roster.values_mut() {
            if let Some(action) = turn.move_slot.take() {
                batch.push(action.into_event());
            }
            if let Some(action) = turn.other_slot.take() {
                batch.push(action.into_event());
            }
            turn.ready = false;
        }
        batch.push(Event::turn_change(false));
        batch.push(Event::EnemyTurn);
        self.players_turn = false;
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EquipItemEvent, MoveEvent};
    use crate::types::{GridPoint, NetworkId};

    fn mv(creature: u64) -> Action {
        Action::Move(MoveEvent {
            creature: NetworkId(creature),
            path: vec![GridPoint::new(0, 0), GridPoint::new(0, 1)],
        })
    }

    fn equip(creature: u64, slot: usize) -> Action {
        Action::EquipItem(EquipItemEvent {
            creature: NetworkId(creature),
            inventory_slot: slot,
        })
    }

    #[test]
    fn empty_roster_never_closes() {
        let turn = TurnState::default();
        assert!(turn.players_turn);
        assert!(!turn.barrier_satisfied());
    }

    #[test]
    fn barrier_needs_every_player() {
        let mut turn = TurnState::default();
        turn.join(PlayerId(1));
        turn.join(PlayerId(2));
        turn.set_ready(PlayerId(1), true);
        assert!(!turn.barrier_satisfied());
        turn.set_ready(PlayerId(2), true);
        assert!(turn.barrier_satisfied());
        turn.set_ready(PlayerId(2), false);
        assert!(!turn.barrier_satisfied());
    }

    #[test]
    fn leaving_player_releases_barrier() {
        let mut turn = TurnState::default();
        turn.join(PlayerId(1));
        turn.join(PlayerId(2));
        turn.set_ready(PlayerId(1), true);
        assert!(turn.leave(PlayerId(2)));
        assert!(turn.barrier_satisfied());
        assert!(!turn.leave(PlayerId(2)));
    }

    #[test]
    fn later_action_overwrites_same_class() {
        let mut turn = TurnState::default();
        turn.join(PlayerId(1));
        turn.set_action(PlayerId(1), equip(5, 0));
        turn.set_action(PlayerId(1), equip(5, 3));
        turn.set_action(PlayerId(1), mv(5));
        let slots = turn.player(PlayerId(1)).unwrap();
        assert_eq!(slots.other_slot, Some(equip(5, 3)));
        assert_eq!(slots.move_slot, Some(mv(5)));
        assert!(!turn.set_action(PlayerId(9), mv(1)));
    }

    #[test]
    fn batch_order_is_player_then_move_then_other() {
        let mut turn = TurnState::default();
        turn.join(PlayerId(2));
        turn.join(PlayerId(1));
        turn.set_action(PlayerId(2), equip(20, 1));
        turn.set_action(PlayerId(2), mv(20));
        turn.set_action(PlayerId(1), mv(10));
        turn.set_ready(PlayerId(1), true);
        turn.set_ready(PlayerId(2), true);

        let batch = turn.close_turn();
        assert_eq!(
            batch,
            vec![
                mv(10).into_event(),
                mv(20).into_event(),
                equip(20, 1).into_event(),
                Event::turn_change(false),
                Event::EnemyTurn,
            ]
        );
        assert!(!turn.players_turn);
        assert!(!turn.barrier_satisfied());
        assert!(turn.roster().all(|(_, t)| *t == PlayerTurn::default()));
    }

    #[test]
    fn reset_clears_slots_but_not_ready() {
        let mut turn = TurnState::default();
        turn.join(PlayerId(1));
        turn.set_action(PlayerId(1), mv(1));
        turn.set_ready(PlayerId(1), true);
        turn.reset_actions(PlayerId(1));
        let slots = turn.player(PlayerId(1)).unwrap();
        assert!(slots.move_slot.is_none());
        assert!(slots.ready);
    }
}
