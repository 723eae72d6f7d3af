//! Transfer state machine.

use std::fmt;

use crate::error::{Error, Result};

/// Which way the file moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Local file sent to the peer.
    Outgoing,
    /// Peer's file written locally.
    Incoming,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outgoing => f.write_str("outgoing"),
            Direction::Incoming => f.write_str("incoming"),
        }
    }
}

/// State of a transfer.
///
/// ```text
/// Offered -> Accepted -> Active -> Completed
/// Offered -> Rejected
/// any non-terminal -> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Offer sent or received, no decision yet.
    Offered,
    /// Receiver accepted; no data has moved.
    Accepted,
    /// Chunks are flowing.
    Active,
    /// FileEnd seen (incoming) or written (outgoing).
    Completed,
    /// Receiver declined the offer.
    Rejected,
    /// Interrupted before completion.
    Aborted,
}

impl TransferState {
    /// Completed, Rejected and Aborted are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Rejected | TransferState::Aborted
        )
    }

    fn name(self) -> &'static str {
        match self {
            TransferState::Offered => "offered",
            TransferState::Accepted => "accepted",
            TransferState::Active => "active",
            TransferState::Completed => "completed",
            TransferState::Rejected => "rejected",
            TransferState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One file movement.
///
/// Tracks bookkeeping only; local storage lives in
/// [`IncomingTransfer`](super::IncomingTransfer) and
/// [`OutgoingTransfer`](super::OutgoingTransfer).
#[derive(Debug, Clone)]
pub struct Transfer {
    id: u64,
    direction: Direction,
    filename: String,
    total_size: u64,
    bytes_transferred: u64,
    state: TransferState,
    reason: Option<String>,
}

impl Transfer {
    /// Create a transfer in the Offered state.
    pub fn new(id: u64, direction: Direction, filename: impl Into<String>, total_size: u64) -> Self {
        Self {
            id,
            direction,
            filename: filename.into(),
            total_size,
            bytes_transferred: 0,
            state: TransferState::Offered,
            reason: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Reject or abort reason, if any.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    fn transition(&mut self, from: TransferState, to: TransferState) -> Result<()> {
        if self.state != from {
            return Err(Error::InvalidState {
                expected: from.to_string(),
                actual: self.state.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// Offered -> Accepted.
    pub fn accept(&mut self) -> Result<()> {
        self.transition(TransferState::Offered, TransferState::Accepted)
    }

    /// Offered -> Rejected.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(TransferState::Offered, TransferState::Rejected)?;
        self.reason = Some(reason.into());
        Ok(())
    }

    /// Accepted -> Active.
    pub fn activate(&mut self) -> Result<()> {
        self.transition(TransferState::Accepted, TransferState::Active)
    }

    /// Count `len` more bytes.
    ///
    /// Fails without touching the counter if the transfer is not Active or if
    /// the new total would exceed `total_size`.
    pub fn record_chunk(&mut self, len: u64) -> Result<()> {
        if self.state != TransferState::Active {
            return Err(Error::InvalidState {
                expected: TransferState::Active.to_string(),
                actual: self.state.to_string(),
            });
        }
        let next = self.bytes_transferred.saturating_add(len);
        if next > self.total_size {
            return Err(Error::Protocol {
                message: format!(
                    "chunk overruns {}: {} bytes after {} of {}",
                    self.filename, len, self.bytes_transferred, self.total_size
                ),
            });
        }
        self.bytes_transferred = next;
        Ok(())
    }

    /// Active -> Completed.
    pub fn complete(&mut self) -> Result<()> {
        self.transition(TransferState::Active, TransferState::Completed)
    }

    /// Move to Aborted.
    ///
    /// Returns false, leaving the transfer untouched, if it was already
    /// terminal.
    pub fn abort(&mut self, reason: impl Into<String>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = TransferState::Aborted;
        self.reason = Some(reason.into());
        true
    }

    /// Point-in-time snapshot.
    pub fn info(&self) -> TransferInfo {
        TransferInfo {
            id: self.id,
            direction: self.direction,
            filename: self.filename.clone(),
            total_size: self.total_size,
            bytes_transferred: self.bytes_transferred,
            state: self.state,
            reason: self.reason.clone(),
        }
    }
}

/// Snapshot of a [`Transfer`], handed to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    pub id: u64,
    pub direction: Direction,
    pub filename: String,
    pub total_size: u64,
    pub bytes_transferred: u64,
    pub state: TransferState,
    pub reason: Option<String>,
}

impl TransferInfo {
    /// Get transfer progress as a percentage (0.0 - 100.0).
    pub fn progress_percent(&self) -> f64 {
        if self.total_size == 0 {
            if self.state == TransferState::Completed {
                100.0
            } else {
                0.0
            }
        } else {
            (self.bytes_transferred as f64 / self.total_size as f64) * 100.0
        }
    }
}
