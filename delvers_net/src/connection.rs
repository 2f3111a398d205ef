// Per-connection reader and writer threads.
//
// Every TCP connection, on either side, gets exactly two threads:
//
// - a **reader** that blocks in `read_frame`, decodes the envelope, and
//   pushes the result into a bounded channel with a blocking `send`. When the
//   consumer falls behind, the reader stops reading and TCP flow control
//   pushes back on the peer.
// - a **writer** that drains a bounded channel of already-encoded frames and
//   writes them out. When its channel closes (the owner dropped the sender)
//   or a write fails, it shuts the socket down in both directions, which also
//   unblocks the reader.
//
// Frames are `Arc<[u8]>` so a broadcast encodes once and every writer shares
// the same bytes.
//
// Neither thread touches game state. They only move bytes between a socket
// and a channel.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use delvers_protocol::{NetworkMessage, read_frame, write_frame};
use tracing::{debug, warn};

/// One encoded `NetworkMessage`, ready to frame.
pub type Frame = Arc<[u8]>;

/// Spawn the reader thread for `stream`. Each decoded message is wrapped by
/// `wrap` and sent to `tx`; when the stream ends, `on_close` (if any) is sent
/// last.
pub fn spawn_reader<T, F>(
    name: String,
    stream: TcpStream,
    tx: SyncSender<T>,
    wrap: F,
    on_close: Option<T>,
) -> std::io::Result<JoinHandle<()>>
where
    T: Send + 'static,
    F: Fn(NetworkMessage, Frame) -> T + Send + 'static,
{
    thread::Builder::new().name(name.clone()).spawn(move || {
        let mut reader = BufReader::new(stream);
        loop {
            let body = match read_frame(&mut reader) {
                Ok(body) => body,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    debug!(connection = %name, "peer closed connection");
                    break;
                }
                Err(e) => {
                    debug!(connection = %name, error = %e, "read failed");
                    break;
                }
            };
            let message = match NetworkMessage::decode(&body) {
                Ok(message) => message,
                Err(e) => {
                    warn!(connection = %name, error = %e, "malformed message, dropping connection");
                    let _ = reader.get_ref().shutdown(Shutdown::Both);
                    break;
                }
            };
            if tx.send(wrap(message, Frame::from(body))).is_err() {
                // Consumer is gone.
                return;
            }
        }
        if let Some(last) = on_close {
            let _ = tx.send(last);
        }
    })
}

/// Spawn the writer thread for `stream`.
pub fn spawn_writer(name: String, stream: TcpStream, rx: Receiver<Frame>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name.clone()).spawn(move || {
        let mut writer = BufWriter::new(stream);
        for frame in rx {
            if let Err(e) = write_frame(&mut writer, &frame) {
                debug!(connection = %name, error = %e, "write failed");
                break;
            }
        }
        let _ = writer.get_ref().shutdown(Shutdown::Both);
    })
}

/// Encode a message into a shareable frame.
pub fn encode_frame(message: &NetworkMessage) -> Result<Frame, delvers_protocol::WireError> {
    Ok(Frame::from(message.encode()?))
}
