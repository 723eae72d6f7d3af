//! Close signalling shared by the pump tasks and the session.

use std::fmt;

use tokio::sync::watch;

use crate::error::{Error, ErrorClass};

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `shutdown()` was called locally.
    LocalShutdown,
    /// The peer sent Disconnect.
    PeerDisconnected,
    /// The peer closed the stream without Disconnect.
    PeerClosed,
    /// Read or write on the connection failed.
    Transport(String),
    /// The peer broke framing or protocol rules.
    Protocol(String),
    /// Local storage failed mid-transfer.
    LocalFailure(String),
}

impl CloseReason {
    /// Classify a session-ending error.
    pub fn from_error(err: &Error) -> Self {
        match err.class() {
            ErrorClass::Transport => CloseReason::Transport(err.to_string()),
            ErrorClass::Protocol => CloseReason::Protocol(err.to_string()),
            ErrorClass::Policy => CloseReason::LocalFailure(err.to_string()),
        }
    }

    /// True for the orderly endings.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            CloseReason::LocalShutdown | CloseReason::PeerDisconnected
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::LocalShutdown => f.write_str("local shutdown"),
            CloseReason::PeerDisconnected => f.write_str("peer disconnected"),
            CloseReason::PeerClosed => f.write_str("connection closed by peer"),
            CloseReason::Transport(msg) => write!(f, "transport failure: {msg}"),
            CloseReason::Protocol(msg) => write!(f, "protocol violation: {msg}"),
            CloseReason::LocalFailure(msg) => write!(f, "local failure: {msg}"),
        }
    }
}

/// One-shot, first-writer-wins close flag.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    tx: watch::Sender<Option<CloseReason>>,
}

impl CloseSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Record `reason` unless the signal is already set.
    ///
    /// Returns true if this call closed the signal.
    pub fn close(&self, reason: CloseReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                false
            } else {
                *current = Some(reason);
                true
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The winning reason, once closed.
    pub fn reason(&self) -> Option<CloseReason> {
        self.tx.borrow().clone()
    }

    /// Resolve once the signal is set. Cancel-safe.
    pub async fn closed(&self) -> CloseReason {
        let mut rx = self.tx.subscribe();
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map(|reason| reason.clone());
        match outcome {
            Ok(Some(reason)) => reason,
            // The sender lives in `self`, so the channel cannot close here.
            _ => CloseReason::LocalShutdown,
        }
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_reason_wins() {
        let signal = CloseSignal::new();
        assert!(!signal.is_closed());
        assert!(signal.close(CloseReason::PeerClosed));
        assert!(!signal.close(CloseReason::LocalShutdown));
        assert_eq!(signal.reason(), Some(CloseReason::PeerClosed));
    }

    #[tokio::test]
    async fn closed_wakes_waiters() {
        let signal = CloseSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.closed().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.close(CloseReason::Transport("reset".into()));
        assert_eq!(
            waiter.await.unwrap(),
            CloseReason::Transport("reset".into())
        );
    }

    #[tokio::test]
    async fn closed_returns_immediately_when_already_set() {
        let signal = CloseSignal::new();
        signal.close(CloseReason::PeerDisconnected);
        assert_eq!(signal.closed().await, CloseReason::PeerDisconnected);
    }

    #[test]
    fn reason_from_error_class() {
        let transport = CloseReason::from_error(&Error::ConnectionClosed);
        assert!(matches!(transport, CloseReason::Transport(_)));

        let protocol = CloseReason::from_error(&Error::FrameTooLarge { len: 9, max: 1 });
        assert_eq!(
            protocol,
            CloseReason::Protocol("frame length 9 exceeds maximum 1".into())
        );
    }

    #[test]
    fn clean_reasons() {
        assert!(CloseReason::LocalShutdown.is_clean());
        assert!(CloseReason::PeerDisconnected.is_clean());
        assert!(!CloseReason::PeerClosed.is_clean());
        assert!(!CloseReason::Protocol("x".into()).is_clean());
    }
}
