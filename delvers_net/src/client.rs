// TCP client for connecting to a game server.
//
// Gives the game loop a non-blocking view of one server connection:
// - `connect()` opens the stream and spawns a reader thread (socket to
//   `incoming`) and a writer thread (`outgoing` to socket), both from
//   `connection.rs`.
// - `send()` encodes on the calling thread and `try_send`s the frame. A full
//   queue is reported, never waited on.
// - `poll()` drains `incoming` without blocking.
//
// Both channels are bounded. If the game loop stops polling, the reader
// blocks and TCP pushes back on the server, whose outbox policy then decides
// what happens to us.
//
// See also: `game_client.rs`, which wraps a `NetClient` together with a
// client-role `Simulation`.

use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError, sync_channel};
use std::thread::JoinHandle;

use delvers_protocol::NetworkMessage;
use tracing::debug;

use crate::connection::{Frame, encode_frame, spawn_reader, spawn_writer};
use crate::error::NetError;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub incoming_capacity: usize,
    pub outgoing_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            incoming_capacity: 1024,
            outgoing_capacity: 64,
        }
    }
}

pub struct NetClient {
    outgoing: Option<SyncSender<Frame>>,
    incoming: Receiver<NetworkMessage>,
    stream: TcpStream,
    threads: Vec<JoinHandle<()>>,
}

impl NetClient {
    pub fn connect(addr: impl ToSocketAddrs, config: ClientConfig) -> Result<Self, NetError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        let (in_tx, incoming) = sync_channel(config.incoming_capacity);
        let (outgoing, out_rx) = sync_channel(config.outgoing_capacity);
        let reader = spawn_reader(
            format!("client-reader-{peer}"),
            stream.try_clone()?,
            in_tx,
            |message, _raw| message,
            None,
        )?;
        let writer = spawn_writer(format!("client-writer-{peer}"), stream.try_clone()?, out_rx)?;
        debug!(%peer, "connected");

        Ok(Self {
            outgoing: Some(outgoing),
            incoming,
            stream,
            threads: vec![reader, writer],
        })
    }

    /// Ask to join the game. The server answers with its journal, then our
    /// `SetPlayer`.
    pub fn join(&self) -> Result<(), NetError> {
        self.send(&NetworkMessage::join_request())
    }

    pub fn send(&self, message: &NetworkMessage) -> Result<(), NetError> {
        let frame = encode_frame(message)?;
        let outgoing = self.outgoing.as_ref().ok_or(NetError::MailboxClosed)?;
        match outgoing.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(NetError::OutboxFull),
            Err(TrySendError::Disconnected(_)) => Err(NetError::MailboxClosed),
        }
    }

    /// Everything received so far. Fails with `MailboxClosed` once the
    /// connection is gone and nothing is left to read.
    pub fn poll(&self) -> Result<Vec<NetworkMessage>, NetError> {
        let mut messages = Vec::new();
        loop {
            match self.incoming.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty) => return Ok(messages),
                Err(TryRecvError::Disconnected) if messages.is_empty() => {
                    return Err(NetError::MailboxClosed);
                }
                Err(TryRecvError::Disconnected) => return Ok(messages),
            }
        }
    }

    /// Close the connection and wait for the I/O threads.
    pub fn disconnect(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.outgoing = None;
        let _ = self.stream.shutdown(Shutdown::Both);
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
