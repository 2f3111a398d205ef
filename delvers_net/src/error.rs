// Transport-level errors.
//
// Per-connection I/O failures are not errors at this level: they end that
// connection's threads and surface as a disconnect. `NetError` covers what a
// caller of the server/client API can actually act on.

use std::io;

use delvers_protocol::WireError;
use delvers_sim::{CodecError, DataError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("wire format error: {0}")]
    Wire(#[from] WireError),
    #[error("event codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("game data error: {0}")]
    Data(#[from] DataError),
    #[error("map file error: {0}")]
    Map(#[source] serde_json::Error),
    /// Every sender feeding a mailbox is gone; the loop cannot make progress.
    #[error("mailbox closed")]
    MailboxClosed,
    /// The outgoing queue is full. Nothing was sent.
    #[error("outgoing queue is full")]
    OutboxFull,
}
