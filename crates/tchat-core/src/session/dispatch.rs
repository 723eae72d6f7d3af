//! Inbound frame dispatch.
//!
//! The dispatcher runs on the pump's reader task and exclusively owns the
//! incoming transfer, so its destination file is never written concurrently.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::constants::{REJECT_BUSY, REJECT_DECLINED, REJECT_TOO_LARGE, REJECT_UNWRITABLE};
use crate::error::{Error, ErrorClass, Result};
use crate::protocol::{FileOfferPayload, Frame, FrameKind, TextPayload};
use crate::pump::{CloseReason, Flow, FrameHandler, OutboundSender};
use crate::session::shared::{PeerDecision, Shared, lock};
use crate::session::{ChatLine, Origin, SessionEvent};
use crate::transfer::{
    AcceptPolicy, Direction, IncomingTransfer, Transfer, TransferTracker, sanitize_filename, track,
};

struct ActiveIncoming {
    file: IncomingTransfer,
    tracker: TransferTracker,
}

pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    outbound: OutboundSender,
    policy: Arc<dyn AcceptPolicy>,
    incoming: Option<ActiveIncoming>,
}

impl Dispatcher {
    pub(crate) fn new(
        shared: Arc<Shared>,
        outbound: OutboundSender,
        policy: Arc<dyn AcceptPolicy>,
    ) -> Self {
        Self {
            shared,
            outbound,
            policy,
            incoming: None,
        }
    }

    /// Queue a control reply. The peer blocks on it, so failing to queue one
    /// ends the session.
    ///
    /// Replies draw on the control reserve, which chat and file data cannot
    /// fill; a peer waits for each answer before offering again.
    fn reply(&self, frame: Frame) -> Option<Flow> {
        match self.outbound.try_send(frame) {
            Ok(()) => None,
            Err(Error::QueueFull) => Some(Flow::Stop(CloseReason::LocalFailure(
                "control reserve exhausted while answering an offer".into(),
            ))),
            Err(e) => Some(Flow::Stop(CloseReason::LocalFailure(e.to_string()))),
        }
    }

    fn on_text(&self, text: TextPayload) {
        debug!(sender = %text.sender, len = text.content.len(), "Text received");
        let line = ChatLine {
            sender: text.sender,
            content: text.content,
            timestamp: text.timestamp,
            origin: Origin::Remote,
        };
        self.shared.record(line.clone());
        self.shared.emit(SessionEvent::TextReceived(line));
    }

    async fn on_offer(&mut self, offer: FileOfferPayload) -> Result<Flow> {
        let config = &self.shared.config;
        let filename = sanitize_filename(&offer.filename);
        let transfer = Transfer::new(
            self.shared.next_id(),
            Direction::Incoming,
            filename,
            offer.total_size,
        );
        info!(
            sender = %offer.sender,
            filename = %transfer.filename(),
            total = offer.total_size,
            "File offered by peer"
        );
        self.shared.emit(SessionEvent::IncomingOffer {
            info: transfer.info(),
            sender: offer.sender,
        });

        if let Err(e) = self.screen(&transfer) {
            debug!(error = %e, "Offer refused");
            return Ok(self.refuse(transfer, &reject_reason(&e)));
        }

        let created = IncomingTransfer::create(
            transfer.clone(),
            &config.downloads_dir,
            config.collision,
            config.partial_files,
        )
        .await;
        let mut file = match created {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    dir = %config.downloads_dir.display(),
                    error = %e,
                    "Cannot create destination"
                );
                return Ok(self.refuse(transfer, REJECT_UNWRITABLE));
            }
        };

        if let Some(stop) = self.reply(Frame::FileAccept) {
            file.abort("accept could not be sent").await;
            return Ok(stop);
        }
        file.activate()?;

        let (tracker, handle) = track(file.transfer());
        lock(&self.shared.slots).incoming = Some(handle);
        self.shared
            .emit(SessionEvent::TransferAccepted(file.transfer().info()));
        info!(path = %file.path().display(), "Receiving file");

        self.incoming = Some(ActiveIncoming { file, tracker });
        Ok(Flow::Continue)
    }

    /// Checks an offer must pass before a destination is created.
    fn screen(&self, transfer: &Transfer) -> Result<()> {
        let max = self.shared.config.max_file_size;
        if self.incoming.is_some() {
            return Err(Error::Busy {
                direction: Direction::Incoming,
            });
        }
        if transfer.total_size() > max {
            return Err(Error::FileTooLarge {
                size: transfer.total_size(),
                max,
            });
        }
        if !self
            .policy
            .should_accept(transfer.filename(), transfer.total_size())
        {
            return Err(Error::Rejected {
                reason: REJECT_DECLINED.into(),
            });
        }
        Ok(())
    }

    fn refuse(&self, mut transfer: Transfer, reason: &str) -> Flow {
        info!(filename = %transfer.filename(), reason, "Rejecting offer");
        if let Some(stop) = self.reply(Frame::reject(Some(reason))) {
            return stop;
        }
        // Fresh transfers are always Offered.
        let _ = transfer.reject(reason);
        self.shared.emit(SessionEvent::TransferRejected {
            info: transfer.info(),
            reason: reason.to_string(),
        });
        Flow::Continue
    }

    async fn on_chunk(&mut self, data: Vec<u8>) -> Result<Flow> {
        let Some(mut active) = self.incoming.take() else {
            return Err(Error::UnexpectedFrame {
                kind: FrameKind::FileChunk,
                context: "no active incoming transfer".into(),
            });
        };

        match active.file.write_chunk(&data).await {
            Ok(()) => {
                if active.tracker.publish(active.file.transfer()) {
                    self.shared
                        .emit(SessionEvent::TransferProgress(active.file.transfer().info()));
                }
                self.incoming = Some(active);
                Ok(Flow::Continue)
            }
            Err(e) if e.class() == ErrorClass::Protocol => {
                abort(&self.shared, active, &e.to_string()).await;
                Err(e)
            }
            Err(e) => {
                let reason = format!("cannot write {}: {e}", active.file.path().display());
                abort(&self.shared, active, &reason).await;
                Ok(Flow::Stop(CloseReason::LocalFailure(reason)))
            }
        }
    }

    async fn on_end(&mut self) -> Result<Flow> {
        let Some(mut active) = self.incoming.take() else {
            return Err(Error::UnexpectedFrame {
                kind: FrameKind::FileEnd,
                context: "no active incoming transfer".into(),
            });
        };

        match active.file.finish().await {
            Ok(()) => {
                active.tracker.publish(active.file.transfer());
                let info = active.file.transfer().info();
                info!(
                    path = %active.file.path().display(),
                    bytes = info.bytes_transferred,
                    "File received"
                );
                self.shared.emit(SessionEvent::TransferCompleted {
                    info,
                    path: active.file.path().to_path_buf(),
                });
                Ok(Flow::Continue)
            }
            Err(e) => {
                let reason = format!("cannot finish {}: {e}", active.file.path().display());
                abort(&self.shared, active, &reason).await;
                Ok(Flow::Stop(CloseReason::LocalFailure(reason)))
            }
        }
    }

    fn on_decision(&self, kind: FrameKind, decision: PeerDecision) -> Result<Flow> {
        let pending = lock(&self.shared.slots).pending_decision.take();
        match pending {
            Some(tx) => {
                debug!(?decision, "Peer answered offer");
                // The sender task may already have gone on close.
                let _ = tx.send(decision);
                Ok(Flow::Continue)
            }
            None => Err(Error::UnexpectedFrame {
                kind,
                context: "no outstanding offer".into(),
            }),
        }
    }
}

/// Abort and report, once.
async fn abort(shared: &Shared, mut active: ActiveIncoming, reason: &str) {
    if active.file.abort(reason).await {
        active.tracker.publish(active.file.transfer());
        warn!(filename = %active.file.transfer().filename(), reason, "Incoming transfer aborted");
        shared.emit(SessionEvent::TransferAborted {
            info: active.file.transfer().info(),
            reason: reason.to_string(),
        });
    }
}

/// The reason sent in FileReject for a refused offer.
fn reject_reason(err: &Error) -> String {
    match err {
        Error::Busy { .. } => REJECT_BUSY.to_string(),
        Error::FileTooLarge { .. } => REJECT_TOO_LARGE.to_string(),
        Error::Rejected { reason } => reason.clone(),
        _ => REJECT_UNWRITABLE.to_string(),
    }
}

impl FrameHandler for Dispatcher {
    async fn on_frame(&mut self, frame: Frame) -> Result<Flow> {
        match frame {
            Frame::Text(text) => {
                self.on_text(text);
                Ok(Flow::Continue)
            }
            Frame::FileOffer(offer) => self.on_offer(offer).await,
            Frame::FileAccept => self.on_decision(FrameKind::FileAccept, PeerDecision::Accept),
            Frame::FileReject(reject) => self.on_decision(
                FrameKind::FileReject,
                PeerDecision::Reject(reject.reason),
            ),
            Frame::FileChunk(chunk) => self.on_chunk(chunk.data).await,
            Frame::FileEnd => self.on_end().await,
            Frame::Disconnect => {
                info!("Peer disconnected");
                Ok(Flow::Stop(CloseReason::PeerDisconnected))
            }
        }
    }

    async fn on_close(&mut self, reason: &CloseReason) {
        if let Some(active) = self.incoming.take() {
            abort(&self.shared, active, &reason.to_string()).await;
        }
        lock(&self.shared.slots).pending_decision = None;
        if reason.is_clean() {
            info!(%reason, "Session closed");
        } else {
            warn!(%reason, "Session closed");
        }
        self.shared.emit(SessionEvent::Disconnected {
            reason: reason.clone(),
        });
    }
}
