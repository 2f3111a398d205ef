// Versioned event codec.
//
// Turns `Event`s into wire `EventRecord`s and back. Each event kind has a
// stable one-byte tag and a current schema version, listed in `REGISTRY`
// alongside its name and decode function. The payload is the variant's
// payload struct serialized as JSON; `EnemyTurn` has none.
//
// Decoding rules:
// - an unregistered tag is `CodecError::UnknownKind`;
// - a version newer than the registered one is `UnsupportedVersion` (this
//   build does not know what the newer fields mean);
// - an older version decodes through the same struct, because fields added
//   since are `#[serde(default)]`.
//
// Adding a kind: one `Event` variant, one tag constant, one `REGISTRY` row,
// one arm in `encode_event`.
//
// See also: `event.rs` for the payload structs, `delvers_protocol::message`
// for the envelope the records travel in.

use delvers_protocol::{EventRecord, NetworkMessage, PlayerId};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;
use crate::event::{
    EquipItemEvent, Event, GameStartEvent, MoveEvent, NewPlayerEvent, PickupItemEvent,
    PlayerActionEvent, PlayerLeftEvent, PlayerReadyEvent, ResetPlayerActionsEvent, SetPlayerEvent,
    TurnChangeEvent, UnequipItemEvent, UseSkillEvent,
};

pub const TAG_GAME_START: u8 = 1;
pub const TAG_SET_PLAYER: u8 = 2;
pub const TAG_NEW_PLAYER: u8 = 3;
pub const TAG_PLAYER_ACTION: u8 = 4;
pub const TAG_PLAYER_READY: u8 = 5;
pub const TAG_RESET_PLAYER_ACTIONS: u8 = 6;
pub const TAG_TURN_CHANGE: u8 = 7;
pub const TAG_MOVE: u8 = 8;
pub const TAG_USE_SKILL: u8 = 9;
pub const TAG_PICKUP_ITEM: u8 = 10;
pub const TAG_EQUIP_ITEM: u8 = 11;
pub const TAG_UNEQUIP_ITEM: u8 = 12;
pub const TAG_ENEMY_TURN: u8 = 13;
pub const TAG_PLAYER_LEFT: u8 = 14;

type DecodeFn = fn(&[u8]) -> Result<Event, serde_json::Error>;

/// One registered event kind.
pub struct EventKind {
    pub tag: u8,
    pub name: &'static str,
    pub version: u8,
    decode: DecodeFn,
}

fn decode_as<T: DeserializeOwned + Into<Event>>(payload: &[u8]) -> Result<Event, serde_json::Error> {
    serde_json::from_slice::<T>(payload).map(Into::into)
}

fn decode_enemy_turn(_payload: &[u8]) -> Result<Event, serde_json::Error> {
    Ok(Event::EnemyTurn)
}

static REGISTRY: &[EventKind] = &[
    EventKind {
        tag: TAG_GAME_START,
        name: "GameStart",
        version: 1,
        decode: decode_as::<GameStartEvent>,
    },
    EventKind {
        tag: TAG_SET_PLAYER,
        name: "SetPlayer",
        version: 1,
        decode: decode_as::<SetPlayerEvent>,
    },
    EventKind {
        tag: TAG_NEW_PLAYER,
        name: "NewPlayer",
        version: 1,
        decode: decode_as::<NewPlayerEvent>,
    },
    EventKind {
        tag: TAG_PLAYER_ACTION,
        name: "PlayerAction",
        version: 1,
        decode: decode_as::<PlayerActionEvent>,
    },
    // v2: explicit `ready` flag.
    EventKind {
        tag: TAG_PLAYER_READY,
        name: "PlayerReady",
        version: 2,
        decode: decode_as::<PlayerReadyEvent>,
    },
    EventKind {
        tag: TAG_RESET_PLAYER_ACTIONS,
        name: "ResetPlayerActions",
        version: 1,
        decode: decode_as::<ResetPlayerActionsEvent>,
    },
    EventKind {
        tag: TAG_TURN_CHANGE,
        name: "TurnChange",
        version: 1,
        decode: decode_as::<TurnChangeEvent>,
    },
    EventKind {
        tag: TAG_MOVE,
        name: "Move",
        version: 1,
        decode: decode_as::<MoveEvent>,
    },
    EventKind {
        tag: TAG_USE_SKILL,
        name: "UseSkill",
        version: 1,
        decode: decode_as::<UseSkillEvent>,
    },
    EventKind {
        tag: TAG_PICKUP_ITEM,
        name: "PickupItem",
        version: 1,
        decode: decode_as::<PickupItemEvent>,
    },
    EventKind {
        tag: TAG_EQUIP_ITEM,
        name: "EquipItem",
        version: 1,
        decode: decode_as::<EquipItemEvent>,
    },
    EventKind {
        tag: TAG_UNEQUIP_ITEM,
        name: "UnequipItem",
        version: 1,
        decode: decode_as::<UnequipItemEvent>,
    },
    EventKind {
        tag: TAG_ENEMY_TURN,
        name: "EnemyTurn",
        version: 1,
        decode: decode_enemy_turn,
    },
    EventKind {
        tag: TAG_PLAYER_LEFT,
        name: "PlayerLeft",
        version: 1,
        decode: decode_as::<PlayerLeftEvent>,
    },
];

pub fn kind_for_tag(tag: u8) -> Option<&'static EventKind> {
    REGISTRY.iter().find(|k| k.tag == tag)
}

fn tag_of(event: &Event) -> u8 {
    match event {
        Event::GameStart(_) => TAG_GAME_START,
        Event::SetPlayer(_) => TAG_SET_PLAYER,
        Event::NewPlayer(_) => TAG_NEW_PLAYER,
        Event::PlayerAction(_) => TAG_PLAYER_ACTION,
        Event::PlayerReady(_) => TAG_PLAYER_READY,
        Event::ResetPlayerActions(_) => TAG_RESET_PLAYER_ACTIONS,
        Event::TurnChange(_) => TAG_TURN_CHANGE,
        Event::Move(_) => TAG_MOVE,
        Event::UseSkill(_) => TAG_USE_SKILL,
        Event::PickupItem(_) => TAG_PICKUP_ITEM,
        Event::EquipItem(_) => TAG_EQUIP_ITEM,
        Event::UnequipItem(_) => TAG_UNEQUIP_ITEM,
        Event::EnemyTurn => TAG_ENEMY_TURN,
        Event::PlayerLeft(_) => TAG_PLAYER_LEFT,
    }
}

/// Registered name of an event's kind, for logs.
pub fn event_name(event: &Event) -> &'static str {
    kind_for_tag(tag_of(event)).map_or("Unknown", |k| k.name)
}

fn to_json<T: Serialize>(payload: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(payload)
}

pub fn encode_event(event: &Event) -> Result<EventRecord, CodecError> {
    let tag = tag_of(event);
    let kind = kind_for_tag(tag).ok_or(CodecError::UnknownKind(tag))?;
    let payload = match event {
        Event::GameStart(e) => to_json(e),
        Event::SetPlayer(e) => to_json(e),
        Event::NewPlayer(e) => to_json(e),
        Event::PlayerAction(e) => to_json(e),
        Event::PlayerReady(e) => to_json(e),
        Event::ResetPlayerActions(e) => to_json(e),
        Event::TurnChange(e) => to_json(e),
        Event::Move(e) => to_json(e),
        Event::UseSkill(e) => to_json(e),
        Event::PickupItem(e) => to_json(e),
        Event::EquipItem(e) => to_json(e),
        Event::UnequipItem(e) => to_json(e),
        Event::EnemyTurn => Ok(Vec::new()),
        Event::PlayerLeft(e) => to_json(e),
    }
    .map_err(|source| CodecError::Payload {
        name: kind.name,
        source,
    })?;
    Ok(EventRecord {
        kind: tag,
        version: kind.version,
        payload,
    })
}

pub fn decode_event(record: &EventRecord) -> Result<Event, CodecError> {
    let kind = kind_for_tag(record.kind).ok_or(CodecError::UnknownKind(record.kind))?;
    if record.version > kind.version {
        return Err(CodecError::UnsupportedVersion {
            name: kind.name,
            found: record.version,
            supported: kind.version,
        });
    }
    (kind.decode)(&record.payload).map_err(|source| CodecError::Payload {
        name: kind.name,
        source,
    })
}

pub fn encode_events(events: &[Event]) -> Result<Vec<EventRecord>, CodecError> {
    events.iter().map(encode_event).collect()
}

/// Decode every record in a message. One bad record rejects the message.
pub fn decode_events(records: &[EventRecord]) -> Result<Vec<Event>, CodecError> {
    records.iter().map(decode_event).collect()
}

/// Build a message from `sender` carrying `events`.
pub fn message_from_events(sender: PlayerId, events: &[Event]) -> Result<NetworkMessage, CodecError> {
    Ok(NetworkMessage::new(sender, encode_events(events)?))
}
