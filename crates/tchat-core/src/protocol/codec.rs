//! Wire codec for tchat frames.
//!
//! Format: 4-byte little-endian length prefix + bincode-encoded [`Frame`]
//!
//! The codec ensures:
//! - Frames are length-prefixed for stream framing
//! - The configured maximum frame length is enforced on both sides
//! - Partial reads return Ok(None) so the caller buffers and retries

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::{DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_LEN};
use crate::error::{Error, Result};
use crate::protocol::Frame;

/// Codec for length-prefixed bincode encoding of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    max_frame_len: usize,
}

impl Codec {
    /// Create a codec that refuses frames longer than `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    /// Encode a frame to bytes with length prefix.
    pub fn encode(&self, frame: &Frame) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode_into(frame, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Append an encoded frame (header included) to `dst`.
    pub fn encode_into(&self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        let payload = bincode::serialize(frame).map_err(|e| Error::Codec {
            message: format!("serialization failed: {}", e),
        })?;

        let too_large = || Error::FrameTooLarge {
            len: payload.len(),
            max: self.max_frame_len,
        };
        if payload.len() > self.max_frame_len {
            return Err(too_large());
        }
        let len = u32::try_from(payload.len()).map_err(|_| too_large())?;

        dst.reserve(FRAME_HEADER_LEN + payload.len());
        dst.put_u32_le(len);
        dst.put_slice(&payload);
        Ok(())
    }

    /// Decode a frame from a buffer.
    ///
    /// Returns:
    /// - Ok(Some(frame)) if a complete frame was decoded (buffer is advanced)
    /// - Ok(None) if more data is needed (buffer unchanged)
    /// - Err if the data is malformed or the declared length is too large
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

        // Reject before buffering an oversized payload.
        if len > self.max_frame_len {
            return Err(Error::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        if buf.len() < FRAME_HEADER_LEN + len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_LEN);
        let payload = buf.split_to(len);
        let frame = bincode::deserialize(&payload).map_err(|e| Error::Codec {
            message: format!("deserialization failed: {}", e),
        })?;

        Ok(Some(frame))
    }

    /// Decode from a slice (convenience for testing).
    pub fn decode_slice(&self, data: &[u8]) -> Result<Option<Frame>> {
        let mut buf = BytesMut::from(data);
        self.decode(&mut buf)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}
