//! Observable transfer progress.
//!
//! The task that owns a transfer publishes snapshots through a
//! [`TransferTracker`]; callers watch them through a [`TransferHandle`].

use tokio::sync::watch;

use crate::constants::PROGRESS_STEP_PERCENT;
use crate::transfer::{Direction, Transfer, TransferInfo, TransferState};

/// Create a linked tracker/handle pair seeded with `transfer`'s state.
pub fn track(transfer: &Transfer) -> (TransferTracker, TransferHandle) {
    let (tx, rx) = watch::channel(transfer.info());
    (TransferTracker { tx, last_step: 0 }, TransferHandle { rx })
}

/// Publishing side, held by whichever task owns the transfer.
#[derive(Debug)]
pub struct TransferTracker {
    tx: watch::Sender<TransferInfo>,
    last_step: u8,
}

impl TransferTracker {
    /// Publish the current snapshot.
    ///
    /// Returns true when progress crossed a new [`PROGRESS_STEP_PERCENT`]
    /// boundary since the last call that returned true.
    pub fn publish(&mut self, transfer: &Transfer) -> bool {
        let info = transfer.info();
        let step = (info.progress_percent() as u8) / PROGRESS_STEP_PERCENT;
        self.tx.send_replace(info);
        if step > self.last_step {
            self.last_step = step;
            true
        } else {
            false
        }
    }
}

/// Caller-facing view of one transfer.
#[derive(Debug, Clone)]
pub struct TransferHandle {
    rx: watch::Receiver<TransferInfo>,
}

impl TransferHandle {
    pub fn id(&self) -> u64 {
        self.rx.borrow().id
    }

    pub fn direction(&self) -> Direction {
        self.rx.borrow().direction
    }

    pub fn filename(&self) -> String {
        self.rx.borrow().filename.clone()
    }

    pub fn total_size(&self) -> u64 {
        self.rx.borrow().total_size
    }

    /// Latest snapshot.
    pub fn info(&self) -> TransferInfo {
        self.rx.borrow().clone()
    }

    /// Whether the transfer still occupies its direction's slot.
    pub fn is_live(&self) -> bool {
        !self.rx.borrow().state.is_terminal()
    }

    /// Wait for a terminal state.
    ///
    /// A transfer whose owner went away before finishing counts as Aborted.
    pub async fn wait(&self) -> TransferState {
        let mut rx = self.rx.clone();
        let outcome = rx
            .wait_for(|info| info.state.is_terminal())
            .await
            .map(|info| info.state);
        match outcome {
            Ok(state) => state,
            Err(_) => {
                let state = rx.borrow().state;
                if state.is_terminal() {
                    state
                } else {
                    TransferState::Aborted
                }
            }
        }
    }
}
