//! In-memory connections.

use tokio::io::DuplexStream;

use crate::{FaultHandle, FaultyStream};

/// Bytes buffered in each direction of a [`duplex_pair`].
pub const DUPLEX_BUFFER: usize = 64 * 1024;

/// Two connected in-memory streams.
pub fn duplex_pair() -> (DuplexStream, DuplexStream) {
    tokio::io::duplex(DUPLEX_BUFFER)
}

/// Like [`duplex_pair`], with fault injection on the first end.
pub fn faulty_pair() -> (FaultyStream<DuplexStream>, FaultHandle, DuplexStream) {
    let (a, b) = duplex_pair();
    let (faulty, handle) = FaultyStream::new(a);
    (faulty, handle, b)
}
