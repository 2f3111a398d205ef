// Error type for envelope encoding/decoding and framed stream I/O.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("bad envelope magic: {0:02x?}")]
    BadMagic([u8; 4]),
    #[error("message truncated while reading {0}")]
    Truncated(&'static str),
    #[error("{0} trailing bytes after message body")]
    TrailingBytes(usize),
    #[error("{what} too large: {len} bytes")]
    TooLarge { what: &'static str, len: usize },
}
