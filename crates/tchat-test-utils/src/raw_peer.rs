//! A peer that speaks raw frames, for driving a session from tests.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use tchat_core::error::{Error, Result};
use tchat_core::protocol::{Codec, Frame};

/// Frame-level endpoint with no session logic behind it.
#[derive(Debug)]
pub struct RawPeer<S> {
    stream: S,
    codec: Codec,
    buf: BytesMut,
}

impl<S: AsyncRead + AsyncWrite + Unpin> RawPeer<S> {
    pub fn new(stream: S) -> Self {
        Self::with_codec(stream, Codec::default())
    }

    pub fn with_codec(stream: S, codec: Codec) -> Self {
        Self {
            stream,
            codec,
            buf: BytesMut::new(),
        }
    }

    /// Encode and write one frame.
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        let bytes = self.codec.encode(frame)?;
        self.send_raw(&bytes).await
    }

    /// Write bytes verbatim, bypassing the codec.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Next frame; [`Error::ConnectionClosed`] on EOF.
    pub async fn recv(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.buf)? {
                return Ok(frame);
            }
            if self.stream.read_buf(&mut self.buf).await? == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Next frame, or `None` if nothing arrives within `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Frame>> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(frame) => frame.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Every frame until the other side closes.
    pub async fn recv_until_closed(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        loop {
            match self.recv().await {
                Ok(frame) => frames.push(frame),
                Err(Error::ConnectionClosed) => return Ok(frames),
                Err(e) => return Err(e),
            }
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_between_raw_peers() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = RawPeer::new(a);
        let mut right = RawPeer::new(b);

        left.send(&Frame::text("alice", "hi")).await.unwrap();
        left.send(&Frame::FileEnd).await.unwrap();

        match right.recv().await.unwrap() {
            Frame::Text(text) => assert_eq!(text.content, "hi"),
            other => panic!("unexpected frame {other:?}"),
        }
        assert_eq!(right.recv().await.unwrap(), Frame::FileEnd);
    }

    #[tokio::test]
    async fn recv_timeout_on_silence() {
        let (a, _b) = tokio::io::duplex(64);
        let mut peer = RawPeer::new(a);
        let got = peer.recv_timeout(Duration::from_millis(20)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn recv_until_closed_collects_everything() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = RawPeer::new(a);
        let mut right = RawPeer::new(b);

        left.send(&Frame::FileAccept).await.unwrap();
        left.send(&Frame::Disconnect).await.unwrap();
        drop(left);

        let frames = right.recv_until_closed().await.unwrap();
        assert_eq!(frames, vec![Frame::FileAccept, Frame::Disconnect]);
    }
}
