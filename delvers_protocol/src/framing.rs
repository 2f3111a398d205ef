// Length-delimited framing over TCP.
//
// Each frame is a 4-byte big-endian length followed by that many bytes. The
// frame body is one encoded `NetworkMessage` (see `message.rs`); the raw
// `write_frame`/`read_frame` pair is byte-oriented and the `*_network_message`
// helpers layer the envelope codec on top.
//
// `MAX_FRAME_SIZE` (16 MB) bounds the allocation a malformed length prefix can
// trigger. The join replay, which carries the whole session journal in one
// message, is the largest frame in practice.

use std::io::{self, Read, Write};

use crate::error::WireError;
use crate::message::NetworkMessage;

/// Upper bound on a single frame body.
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Write one frame and flush.
pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> io::Result<()> {
    let len = match u32::try_from(body.len()) {
        Ok(len) if len <= MAX_FRAME_SIZE => len,
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame too large: {} bytes (max {MAX_FRAME_SIZE})", body.len()),
            ));
        }
    };
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(body)?;
    writer.flush()
}

/// Read one frame.
///
/// A stream that closes between frames yields `UnexpectedEof`, which callers
/// treat as a clean disconnect.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn write_network_message<W: Write>(
    writer: &mut W,
    msg: &NetworkMessage,
) -> Result<(), WireError> {
    let body = msg.encode()?;
    write_frame(writer, &body)?;
    Ok(())
}

pub fn read_network_message<R: Read>(reader: &mut R) -> Result<NetworkMessage, WireError> {
    let body = read_frame(reader)?;
    NetworkMessage::decode(&body)
}
