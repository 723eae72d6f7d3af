//! Outgoing transfer task.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::constants::REJECT_DECLINED;
use crate::error::Error;
use crate::protocol::Frame;
use crate::pump::{CloseReason, CloseSignal, OutboundSender};
use crate::session::SessionEvent;
use crate::session::shared::{PeerDecision, Shared};
use crate::transfer::{OutgoingTransfer, TransferTracker};

/// How streaming ended early.
enum Interrupted {
    /// The session closed underneath us.
    Closed,
    /// Reading the source failed.
    Local(Error),
}

pub(crate) struct OutgoingTask {
    pub(crate) file: OutgoingTransfer,
    pub(crate) tracker: TransferTracker,
    pub(crate) decision: oneshot::Receiver<PeerDecision>,
    pub(crate) outbound: OutboundSender,
    pub(crate) close: CloseSignal,
    pub(crate) shared: Arc<Shared>,
}

impl OutgoingTask {
    /// Wait for the peer's answer, then stream the file.
    pub(crate) async fn run(mut self) {
        let decision = tokio::select! {
            decision = &mut self.decision => decision.ok(),
            _ = self.close.closed() => None,
        };

        match decision {
            Some(PeerDecision::Accept) => self.send_file().await,
            Some(PeerDecision::Reject(reason)) => {
                let reason = reason.unwrap_or_else(|| REJECT_DECLINED.to_string());
                info!(filename = %self.file.transfer().filename(), %reason, "Offer rejected by peer");
                // Still Offered: nothing else touches the transfer.
                let _ = self.file.reject(reason.clone());
                self.tracker.publish(self.file.transfer());
                self.shared.emit(SessionEvent::TransferRejected {
                    info: self.file.transfer().info(),
                    reason,
                });
            }
            None => {
                let reason = self.close_reason();
                self.abort(&reason);
            }
        }
    }

    async fn send_file(&mut self) {
        if let Err(e) = self.file.start() {
            self.abort(&e.to_string());
            return;
        }
        self.tracker.publish(self.file.transfer());
        self.shared
            .emit(SessionEvent::TransferAccepted(self.file.transfer().info()));
        info!(
            filename = %self.file.transfer().filename(),
            total = self.file.transfer().total_size(),
            "Sending file"
        );

        match self.stream().await {
            Ok(()) => {
                // FileEnd is on the wire; the source is released here.
                let _ = self.file.finish();
                self.tracker.publish(self.file.transfer());
                info!(filename = %self.file.transfer().filename(), "File sent");
                self.shared.emit(SessionEvent::TransferCompleted {
                    info: self.file.transfer().info(),
                    path: self.file.path().to_path_buf(),
                });
            }
            Err(Interrupted::Closed) => {
                let reason = self.close_reason();
                self.abort(&reason);
            }
            Err(Interrupted::Local(e)) => {
                let reason = format!("cannot read {}: {e}", self.file.path().display());
                self.abort(&reason);
                // The receiver would wait forever for the rest of the file.
                self.close.close(CloseReason::LocalFailure(reason));
            }
        }
    }

    async fn stream(&mut self) -> Result<(), Interrupted> {
        loop {
            let chunk = self.file.next_chunk().await.map_err(Interrupted::Local)?;
            let Some(data) = chunk else {
                break;
            };
            self.outbound
                .send(Frame::chunk(data))
                .await
                .map_err(Self::interrupted)?;
            if self.tracker.publish(self.file.transfer()) {
                self.shared
                    .emit(SessionEvent::TransferProgress(self.file.transfer().info()));
            }
        }
        self.outbound
            .send_confirmed(Frame::FileEnd)
            .await
            .map_err(Self::interrupted)
    }

    fn interrupted(err: Error) -> Interrupted {
        match err {
            Error::Disconnected => Interrupted::Closed,
            other => Interrupted::Local(other),
        }
    }

    fn close_reason(&self) -> String {
        self.close
            .reason()
            .unwrap_or(CloseReason::LocalShutdown)
            .to_string()
    }

    fn abort(&mut self, reason: &str) {
        if self.file.abort(reason) {
            self.tracker.publish(self.file.transfer());
            warn!(filename = %self.file.transfer().filename(), reason, "Outgoing transfer aborted");
            self.shared.emit(SessionEvent::TransferAborted {
                info: self.file.transfer().info(),
                reason: reason.to_string(),
            });
        } else {
            debug!(reason, "Outgoing transfer already finished");
        }
    }
}
