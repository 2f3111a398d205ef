// The network message envelope and its binary encoding.
//
// A `NetworkMessage` carries a sender, a "new player" flag (set only on the
// join request a fresh client sends), and an ordered list of `EventRecord`s.
// An `EventRecord` is a self-describing event: a kind tag, the payload schema
// version the sender wrote, and the opaque payload bytes. This crate never
// interprets payloads; `delvers_sim::codec` owns the tag registry and turns
// records into typed events. The server relays the records it received
// verbatim, so it never re-encodes a client's events.
//
// Wire layout (all integers big-endian):
//
//   magic "DLV1" | sender u32 | flags u8 | count u32 |
//   count x ( kind u8 | version u8 | len u32 | payload[len] )
//
// One encoded message is written per frame (see `framing.rs`).

use crate::error::WireError;
use crate::types::PlayerId;

/// Envelope magic. Bump the trailing digit if the envelope layout changes.
pub const ENVELOPE_MAGIC: [u8; 4] = *b"DLV1";

const FLAG_NEW_PLAYER: u8 = 0b0000_0001;

/// One encoded event: registry tag, payload schema version, payload bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub kind: u8,
    pub version: u8,
    pub payload: Vec<u8>,
}

/// The unit of transmission between server and clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkMessage {
    pub sender: PlayerId,
    pub new_player: bool,
    pub records: Vec<EventRecord>,
}

impl NetworkMessage {
    pub fn new(sender: PlayerId, records: Vec<EventRecord>) -> Self {
        Self {
            sender,
            new_player: false,
            records,
        }
    }

    /// The empty join request a client sends as its first message.
    pub fn join_request() -> Self {
        Self {
            sender: PlayerId::HOST,
            new_player: true,
            records: Vec::new(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let body: usize = self.records.iter().map(|r| 6 + r.payload.len()).sum();
        let mut out = Vec::with_capacity(13 + body);
        out.extend_from_slice(&ENVELOPE_MAGIC);
        out.extend_from_slice(&self.sender.0.to_be_bytes());
        out.push(if self.new_player { FLAG_NEW_PLAYER } else { 0 });
        out.extend_from_slice(&len_u32("record count", self.records.len())?.to_be_bytes());
        for record in &self.records {
            out.push(record.kind);
            out.push(record.version);
            out.extend_from_slice(&len_u32("event payload", record.payload.len())?.to_be_bytes());
            out.extend_from_slice(&record.payload);
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut cur = ByteCursor { bytes, pos: 0 };
        let magic: [u8; 4] = cur.take_array("magic")?;
        if magic != ENVELOPE_MAGIC {
            return Err(WireError::BadMagic(magic));
        }
        let sender = PlayerId(u32::from_be_bytes(cur.take_array("sender")?));
        let flags = cur.take_u8("flags")?;
        let count = u32::from_be_bytes(cur.take_array("record count")?) as usize;

        // Each record needs at least 6 header bytes; reject absurd counts
        // before allocating.
        if count > cur.remaining() / 6 {
            return Err(WireError::Truncated("records"));
        }
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = cur.take_u8("record kind")?;
            let version = cur.take_u8("record version")?;
            let len = u32::from_be_bytes(cur.take_array("record length")?) as usize;
            let payload = cur.take_slice(len, "record payload")?.to_vec();
            records.push(EventRecord {
                kind,
                version,
                payload,
            });
        }
        if cur.remaining() != 0 {
            return Err(WireError::TrailingBytes(cur.remaining()));
        }
        Ok(Self {
            sender,
            new_player: flags & FLAG_NEW_PLAYER != 0,
            records,
        })
    }
}

fn len_u32(what: &'static str, len: usize) -> Result<u32, WireError> {
    u32::try_from(len).map_err(|_| WireError::TooLarge { what, len })
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take_slice(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], WireError> {
        if self.remaining() < len {
            return Err(WireError::Truncated(what));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], WireError> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.take_slice(N, what)?);
        Ok(arr)
    }

    fn take_u8(&mut self, what: &'static str) -> Result<u8, WireError> {
        Ok(self.take_slice(1, what)?[0])
    }
}
