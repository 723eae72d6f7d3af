//! Error types for tchat-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::FrameKind;
use crate::transfer::Direction;

/// Broad category of an [`Error`], deciding whether the session survives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection lost or reset. Fatal to the session.
    Transport,
    /// Frame boundaries or protocol rules violated. Fatal to the session.
    Protocol,
    /// Local, recoverable refusal reported to the caller.
    Policy,
}

/// Main error type for tchat operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the connection or local storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport layer error.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Codec error during encoding/decoding.
    #[error("codec error: {message}")]
    Codec { message: String },

    /// Declared frame length over the configured maximum.
    #[error("frame length {len} exceeds maximum {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Protocol violation.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// A frame arrived that the current transfer state does not allow.
    #[error("unexpected {kind} frame: {context}")]
    UnexpectedFrame { kind: FrameKind, context: String },

    /// A transfer in the same direction is already in progress.
    #[error("{direction} transfer already in progress")]
    Busy { direction: Direction },

    /// The peer rejected an offered file.
    #[error("transfer rejected: {reason}")]
    Rejected { reason: String },

    /// Source file missing or unreadable.
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// File exceeds the configured size limit.
    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    /// A local frame too large to send; nothing was queued.
    #[error("outgoing frame of {len} bytes exceeds limit {max}")]
    OversizeFrame { len: usize, max: usize },

    /// The outbound queue is at its bound.
    #[error("outbound queue full")]
    QueueFull,

    /// The session has ended.
    #[error("session disconnected")]
    Disconnected,

    /// Invalid state transition.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl Error {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Io(_) | Error::Transport { .. } | Error::ConnectionClosed => {
                ErrorClass::Transport
            }
            Error::Codec { .. }
            | Error::FrameTooLarge { .. }
            | Error::Protocol { .. }
            | Error::UnexpectedFrame { .. } => ErrorClass::Protocol,
            Error::Busy { .. }
            | Error::Rejected { .. }
            | Error::NotFound { .. }
            | Error::FileTooLarge { .. }
            | Error::OversizeFrame { .. }
            | Error::QueueFull
            | Error::Disconnected
            | Error::InvalidState { .. }
            | Error::Config { .. } => ErrorClass::Policy,
        }
    }

    /// Returns true if this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Transport | ErrorClass::Protocol)
    }
}

/// Convenience result type for tchat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_frame_too_large() {
        let err = Error::FrameTooLarge { len: 10, max: 4 };
        assert_eq!(err.to_string(), "frame length 10 exceeds maximum 4");
    }

    #[test]
    fn error_display_busy() {
        let err = Error::Busy {
            direction: Direction::Outgoing,
        };
        assert_eq!(err.to_string(), "outgoing transfer already in progress");
    }

    #[test]
    fn error_display_not_found() {
        let err = Error::NotFound {
            path: PathBuf::from("/tmp/missing.bin"),
        };
        assert_eq!(err.to_string(), "file not found: /tmp/missing.bin");
    }

    #[test]
    fn error_display_unexpected_frame() {
        let err = Error::UnexpectedFrame {
            kind: FrameKind::FileChunk,
            context: "no active incoming transfer".into(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected FileChunk frame: no active incoming transfer"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.class(), ErrorClass::Transport);
    }

    #[test]
    fn fatal_errors() {
        assert!(Error::ConnectionClosed.is_fatal());
        assert!(Error::Transport {
            message: "lost".into()
        }
        .is_fatal());
        assert!(Error::Codec {
            message: "garbage".into()
        }
        .is_fatal());
        assert!(Error::FrameTooLarge { len: 2, max: 1 }.is_fatal());
        assert!(Error::UnexpectedFrame {
            kind: FrameKind::FileEnd,
            context: "idle".into()
        }
        .is_fatal());
    }

    #[test]
    fn policy_errors_are_recoverable() {
        assert!(!Error::Busy {
            direction: Direction::Incoming
        }
        .is_fatal());
        assert!(!Error::Rejected {
            reason: "busy".into()
        }
        .is_fatal());
        assert!(!Error::NotFound {
            path: PathBuf::from("x")
        }
        .is_fatal());
        assert!(!Error::QueueFull.is_fatal());
        assert!(!Error::OversizeFrame { len: 9, max: 1 }.is_fatal());
        assert!(!Error::Disconnected.is_fatal());
        assert_eq!(Error::QueueFull.class(), ErrorClass::Policy);
    }
}
