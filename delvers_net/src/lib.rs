// delvers_net: TCP transport for Delvers.
//
// The server hosts the authoritative replica and relays every admitted
// message to all joined clients; clients run their own replica and apply
// what the server relays. No game rules live here beyond screening which
// events a client may send. All rules are in `delvers_sim`.
//
// Module overview:
// - `connection.rs`:  Per-connection reader/writer threads and the shared
//                     `Frame` type. Used by both sides.
// - `session.rs`:     Server state owned by the sim thread: the mailbox,
//                     peers and their outboxes, the join protocol, relaying.
// - `server.rs`:      Listener and sim threads, `ServerConfig`,
//                     `ServerHandle`.
// - `client.rs`:      `NetClient`, a non-blocking connection to a server.
// - `game_client.rs`: `GameClient`, a `NetClient` plus a client replica, and
//                     the local action screen.
// - `autopilot.rs`:   Headless player used by the `delvers client` binary.
// - `error.rs`:       `NetError`.
//
// Dependencies: `delvers_protocol` (envelope and framing), `delvers_sim`
// (events, codec, replica). Everything is `std::net` plus threads and
// bounded `mpsc` channels.

pub mod autopilot;
pub mod client;
pub mod connection;
pub mod error;
pub mod game_client;
pub mod server;
pub mod session;

pub use client::{ClientConfig, NetClient};
pub use error::NetError;
pub use game_client::GameClient;
pub use server::{ServerConfig, ServerHandle, start_server};
