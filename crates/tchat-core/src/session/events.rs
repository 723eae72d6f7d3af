//! Notifications for the presentation layer.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::pump::CloseReason;
use crate::session::ChatLine;
use crate::transfer::TransferInfo;

/// Something the user should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Peer chat text, already recorded in history.
    TextReceived(ChatLine),
    /// The peer offered a file; the accept decision follows immediately.
    IncomingOffer { info: TransferInfo, sender: String },
    /// A transfer in either direction was accepted.
    TransferAccepted(TransferInfo),
    /// Progress crossed another step.
    TransferProgress(TransferInfo),
    /// `path` is the local file written (incoming) or read (outgoing).
    TransferCompleted { info: TransferInfo, path: PathBuf },
    TransferRejected { info: TransferInfo, reason: String },
    /// Emitted once per aborted transfer.
    TransferAborted { info: TransferInfo, reason: String },
    /// The session ended. Emitted once.
    Disconnected { reason: CloseReason },
}

/// Receiving end of a session's events.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

pub(crate) type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Connection status as seen through [`Session::status`](super::Session::status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Connected,
    Disconnected(CloseReason),
}

impl SessionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionStatus::Connected)
    }
}
