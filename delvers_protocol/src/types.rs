// Core ID types for the wire protocol.
//
// `PlayerId` is the compact integer the server hands out on join. It appears
// both in the message envelope (`NetworkMessage::sender`) and inside sim event
// payloads, so it derives serde and lives here rather than in the sim crate.
// Player 0 is reserved for the hosting process; remote players count up from 1.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned player ID. Stable for the lifetime of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// The player slot owned by the server process itself.
    pub const HOST: PlayerId = PlayerId(0);
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}
