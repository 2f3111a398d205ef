// Replicated game events.
//
// `Event` is the closed set of things that can happen in a session. Every
// state change on every replica is the application of one of these, in the
// same order, so the event stream *is* the game. Each variant wraps a small
// payload struct; the payload is what goes over the wire (as JSON inside an
// `EventRecord`, see `codec.rs`), and the variant tells the codec which tag
// and schema version to use.
//
// `Action` is the subset a player may queue during the players' turn. A player
// holds at most one Move-class action and one other action; `Action::is_move`
// decides which slot an action goes in. Queued actions become ordinary events
// when the turn closes (see `turn.rs`).
//
// Payload fields added after a kind was first shipped carry
// `#[serde(default)]` so older records still decode.
//
// See also: `codec.rs` for tags, versions, and encoding, `sim.rs` for how each
// event is applied, `turn.rs` for the batch a closing turn emits.

use serde::{Deserialize, Serialize};

use crate::entity::EquipSlot;
use crate::skill::SkillTarget;
use crate::snapshot::WorldSnapshot;
use crate::types::{GridPoint, NetworkId, PlayerId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameStartEvent {
    pub snapshot: WorldSnapshot,
}

/// Tells one client which player it is. Sent privately during join.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPlayerEvent {
    pub player: PlayerId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlayerEvent {
    pub player: PlayerId,
    /// Preferred spawn cell. The creature lands on the nearest free tile.
    pub spawn: GridPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerActionEvent {
    pub player: PlayerId,
    pub action: Action,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerReadyEvent {
    pub player: PlayerId,
    /// Absent in version 1 records, which could only mean "ready".
    #[serde(default = "default_ready")]
    pub ready: bool,
}

fn default_ready() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPlayerActionsEvent {
    pub player: PlayerId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnChangeEvent {
    pub players_turn: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEvent {
    pub creature: NetworkId,
    /// Waypoints from the creature's current cell to its destination,
    /// inclusive.
    pub path: Vec<GridPoint>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseSkillEvent {
    pub skill: String,
    pub source: NetworkId,
    pub target: SkillTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupItemEvent {
    pub item: NetworkId,
    pub creature: NetworkId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipItemEvent {
    pub creature: NetworkId,
    pub inventory_slot: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnequipItemEvent {
    pub creature: NetworkId,
    pub equip_slot: EquipSlot,
}

/// A player's connection went away. They leave the turn roster; their
/// creature stays where it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeftEvent {
    pub player: PlayerId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    GameStart(GameStartEvent),
    SetPlayer(SetPlayerEvent),
    NewPlayer(NewPlayerEvent),
    PlayerAction(PlayerActionEvent),
    PlayerReady(PlayerReadyEvent),
    ResetPlayerActions(ResetPlayerActionsEvent),
    TurnChange(TurnChangeEvent),
    Move(MoveEvent),
    UseSkill(UseSkillEvent),
    PickupItem(PickupItemEvent),
    EquipItem(EquipItemEvent),
    UnequipItem(UnequipItemEvent),
    /// Enemies take their turn. Planned by the server only.
    EnemyTurn,
    PlayerLeft(PlayerLeftEvent),
}

/// An action a player can queue for the end of the turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Move(MoveEvent),
    UseSkill(UseSkillEvent),
    PickupItem(PickupItemEvent),
    EquipItem(EquipItemEvent),
    UnequipItem(UnequipItemEvent),
}

impl Action {
    /// Move actions use the move slot; everything else shares the other slot.
    pub fn is_move(&self) -> bool {
        matches!(self, Action::Move(_))
    }

    /// The creature performing this action.
    pub fn actor(&self) -> NetworkId {
        match self {
            Action::Move(e) => e.creature,
            Action::UseSkill(e) => e.source,
            Action::PickupItem(e) => e.creature,
            Action::EquipItem(e) => e.creature,
            Action::UnequipItem(e) => e.creature,
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            Action::Move(e) => Event::Move(e),
            Action::UseSkill(e) => Event::UseSkill(e),
            Action::PickupItem(e) => Event::PickupItem(e),
            Action::EquipItem(e) => Event::EquipItem(e),
            Action::UnequipItem(e) => Event::UnequipItem(e),
        }
    }
}

impl Event {
    pub fn player_action(player: PlayerId, action: Action) -> Self {
        Event::PlayerAction(PlayerActionEvent { player, action })
    }

    pub fn player_ready(player: PlayerId, ready: bool) -> Self {
        Event::PlayerReady(PlayerReadyEvent { player, ready })
    }

    pub fn turn_change(players_turn: bool) -> Self {
        Event::TurnChange(TurnChangeEvent { players_turn })
    }

    pub fn new_player(player: PlayerId, spawn: GridPoint) -> Self {
        Event::NewPlayer(NewPlayerEvent { player, spawn })
    }

    pub fn set_player(player: PlayerId) -> Self {
        Event::SetPlayer(SetPlayerEvent { player })
    }

    pub fn player_left(player: PlayerId) -> Self {
        Event::PlayerLeft(PlayerLeftEvent { player })
    }

    pub fn game_start(snapshot: WorldSnapshot) -> Self {
        Event::GameStart(GameStartEvent { snapshot })
    }
}

macro_rules! event_from_payload {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for Event {
                fn from(e: $payload) -> Self {
                    Event::$variant(e)
                }
            }
        )*
    };
}

event_from_payload! {
    GameStartEvent => GameStart,
    SetPlayerEvent => SetPlayer,
    NewPlayerEvent => NewPlayer,
    PlayerActionEvent => PlayerAction,
    PlayerReadyEvent => PlayerReady,
    ResetPlayerActionsEvent => ResetPlayerActions,
    TurnChangeEvent => TurnChange,
    MoveEvent => Move,
    UseSkillEvent => UseSkill,
    PickupItemEvent => PickupItem,
    EquipItemEvent => EquipItem,
    UnequipItemEvent => UnequipItem,
    PlayerLeftEvent => PlayerLeft,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_slot_classification() {
        let mv = Action::Move(MoveEvent {
            creature: NetworkId(3),
            path: vec![GridPoint::new(1, 1), GridPoint::new(1, 2)],
        });
        let equip = Action::EquipItem(EquipItemEvent {
            creature: NetworkId(3),
            inventory_slot: 0,
        });
        assert!(mv.is_move());
        assert!(!equip.is_move());
        assert_eq!(mv.actor(), NetworkId(3));
        assert!(matches!(equip.into_event(), Event::EquipItem(_)));
    }

    #[test]
    fn ready_defaults_to_true_when_absent() {
        let e: PlayerReadyEvent = serde_json::from_str(r#"{"player":4}"#).unwrap();
        assert_eq!(e.player, PlayerId(4));
        assert!(e.ready);
    }
}
