//! State shared between the session handle, the dispatcher and sender tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::session::events::EventSender;
use crate::session::{ChatHistory, ChatLine, SessionConfig, SessionEvent};
use crate::transfer::{Direction, TransferHandle};

// Lock a std Mutex without panicking on poison
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// The peer's answer to our outstanding offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PeerDecision {
    Accept,
    Reject(Option<String>),
}

/// At most one transfer per direction.
#[derive(Debug, Default)]
pub(crate) struct TransferSlots {
    pub(crate) outgoing: Option<TransferHandle>,
    pub(crate) incoming: Option<TransferHandle>,
    /// Set while our offer awaits FileAccept / FileReject.
    pub(crate) pending_decision: Option<oneshot::Sender<PeerDecision>>,
}

impl TransferSlots {
    pub(crate) fn get(&self, direction: Direction) -> Option<&TransferHandle> {
        match direction {
            Direction::Outgoing => self.outgoing.as_ref(),
            Direction::Incoming => self.incoming.as_ref(),
        }
    }

    /// A non-terminal transfer holds the slot.
    pub(crate) fn is_busy(&self, direction: Direction) -> bool {
        self.get(direction).is_some_and(TransferHandle::is_live)
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) config: SessionConfig,
    pub(crate) history: Mutex<ChatHistory>,
    pub(crate) slots: Mutex<TransferSlots>,
    events: EventSender,
    next_id: AtomicU64,
}

impl Shared {
    pub(crate) fn new(config: SessionConfig, events: EventSender) -> Self {
        Self {
            history: Mutex::new(ChatHistory::new(config.history_limit)),
            slots: Mutex::new(TransferSlots::default()),
            config,
            events,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Nobody listening is fine.
    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn record(&self, line: ChatLine) {
        lock(&self.history).push(line);
    }
}
