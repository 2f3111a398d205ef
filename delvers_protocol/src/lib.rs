// delvers_protocol: wire protocol between the Delvers server and its clients.
//
// This crate defines the message envelope, its binary encoding, and the
// framing used over TCP. It is shared by both roles and knows nothing about
// game rules: events travel as opaque `EventRecord`s whose kind tags are
// owned by the sim crate's codec registry.
//
// Module overview:
// - `types.rs`:    `PlayerId`, the server-assigned player slot.
// - `message.rs`:  `NetworkMessage` / `EventRecord` and the binary envelope
//                  codec (magic, sender, flags, tagged length-prefixed records).
// - `framing.rs`:  4-byte big-endian length-prefixed frames over any
//                  `Read`/`Write`, plus envelope read/write helpers.
// - `error.rs`:    `WireError`.
//
// Design decisions:
// - **Binary envelope, opaque payloads.** The envelope is fixed and versioned
//   by its magic; event payload schemas are versioned per record. The server
//   can rebroadcast records without decoding them.
// - **No async runtime.** Blocking `std::io` streams, one reader and one writer
//   thread per connection on both sides.

pub mod error;
pub mod framing;
pub mod message;
pub mod types;

pub use error::WireError;
pub use framing::{
    MAX_FRAME_SIZE, read_frame, read_network_message, write_frame, write_network_message,
};
pub use message::{ENVELOPE_MAGIC, EventRecord, NetworkMessage};
pub use types::PlayerId;
