//! Frame definitions.
//!
//! A [`Frame`] is the unit exchanged on the wire. Every frame is
//! self-describing; only `FileChunk` and `FileEnd` depend on session state
//! (an incoming transfer must be active for them to mean anything).

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, used for chat timestamps.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    /// Username of the author.
    pub sender: String,
    /// Message body.
    pub content: String,
    /// Milliseconds since the Unix epoch at send time.
    pub timestamp: u64,
}

/// Offer to send a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOfferPayload {
    /// Name proposed by the sender (not yet sanitized).
    pub filename: String,
    /// Exact size of the file in bytes.
    pub total_size: u64,
    /// Username of the sender.
    pub sender: String,
}

/// Refusal of a file offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRejectPayload {
    /// Optional human-readable reason.
    pub reason: Option<String>,
}

/// A contiguous slice of the file being transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunkPayload {
    /// Chunk bytes (at most the sender's chunk size).
    pub data: Vec<u8>,
}

/// A unit on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Chat text.
    Text(TextPayload),
    /// File offer.
    FileOffer(FileOfferPayload),
    /// Receiver accepts the pending offer.
    FileAccept,
    /// Receiver rejects the pending offer.
    FileReject(FileRejectPayload),
    /// File data.
    FileChunk(FileChunkPayload),
    /// End of the current file.
    FileEnd,
    /// Orderly end of the session.
    Disconnect,
}

impl Frame {
    /// Build a text frame stamped with the current time.
    pub fn text(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Frame::Text(TextPayload {
            sender: sender.into(),
            content: content.into(),
            timestamp: unix_millis(),
        })
    }

    /// Build a file offer frame.
    pub fn offer(filename: impl Into<String>, total_size: u64, sender: impl Into<String>) -> Self {
        Frame::FileOffer(FileOfferPayload {
            filename: filename.into(),
            total_size,
            sender: sender.into(),
        })
    }

    /// Build a reject frame.
    pub fn reject(reason: Option<&str>) -> Self {
        Frame::FileReject(FileRejectPayload {
            reason: reason.map(str::to_owned),
        })
    }

    /// Build a chunk frame.
    pub fn chunk(data: Vec<u8>) -> Self {
        Frame::FileChunk(FileChunkPayload { data })
    }

    /// The kind of this frame.
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Text(_) => FrameKind::Text,
            Frame::FileOffer(_) => FrameKind::FileOffer,
            Frame::FileAccept => FrameKind::FileAccept,
            Frame::FileReject(_) => FrameKind::FileReject,
            Frame::FileChunk(_) => FrameKind::FileChunk,
            Frame::FileEnd => FrameKind::FileEnd,
            Frame::Disconnect => FrameKind::Disconnect,
        }
    }
}

/// Payload-free discriminant of [`Frame`], used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Text,
    FileOffer,
    FileAccept,
    FileReject,
    FileChunk,
    FileEnd,
    Disconnect,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Text => "Text",
            FrameKind::FileOffer => "FileOffer",
            FrameKind::FileAccept => "FileAccept",
            FrameKind::FileReject => "FileReject",
            FrameKind::FileChunk => "FileChunk",
            FrameKind::FileEnd => "FileEnd",
            FrameKind::Disconnect => "Disconnect",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Frame::text("a", "b").kind(), FrameKind::Text);
        assert_eq!(Frame::offer("f", 1, "a").kind(), FrameKind::FileOffer);
        assert_eq!(Frame::FileAccept.kind(), FrameKind::FileAccept);
        assert_eq!(Frame::reject(None).kind(), FrameKind::FileReject);
        assert_eq!(Frame::chunk(vec![1]).kind(), FrameKind::FileChunk);
        assert_eq!(Frame::FileEnd.kind(), FrameKind::FileEnd);
        assert_eq!(Frame::Disconnect.kind(), FrameKind::Disconnect);
    }

    #[test]
    fn text_is_timestamped() {
        let before = unix_millis();
        let Frame::Text(text) = Frame::text("alice", "hi") else {
            panic!("expected text frame");
        };
        assert!(text.timestamp >= before);
        assert_eq!(text.sender, "alice");
    }

    #[test]
    fn frame_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Frame>();
    }
}
