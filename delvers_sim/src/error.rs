// Error types for the simulation crate.
//
// Event application itself never fails: a stale or invalid event is logged
// and applied as a no-op. These errors cover the fallible edges around it,
// namely spatial-model mutations (which handlers log and swallow), event
// decoding, and game-data loading.

use std::io;

use thiserror::Error;

use crate::types::{GridPoint, NetworkId};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SpatialError {
    #[error("point {0} is outside the map")]
    OutOfBounds(GridPoint),
    #[error("no tile at {0}")]
    NoTile(GridPoint),
    #[error("cell {at} is already occupied by {occupant}")]
    Occupied { at: GridPoint, occupant: NetworkId },
    #[error("unknown creature {0}")]
    UnknownCreature(NetworkId),
    #[error("unknown item {0}")]
    UnknownItem(NetworkId),
    #[error("item {0} is not on the ground")]
    NotOnGround(NetworkId),
    #[error("creature {0} has no free inventory slot")]
    InventoryFull(NetworkId),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown event kind tag {0}")]
    UnknownKind(u8),
    #[error("{name} record has version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        name: &'static str,
        found: u8,
        supported: u8,
    },
    #[error("malformed {name} payload: {source}")]
    Payload {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read game data: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse game data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate {kind} definition: {name:?}")]
    Duplicate { kind: &'static str, name: String },
    #[error("{owner:?} references unknown skill {skill:?}")]
    UnknownSkill { owner: String, skill: String },
    #[error("{owner:?} references unknown item {item:?}")]
    UnknownItem { owner: String, item: String },
    #[error("unknown creature definition {0:?}")]
    UnknownCreature(String),
}
