//! Session controller.
//!
//! A [`Session`] owns one connection: it starts the duplex pump, applies
//! receiver policy through its dispatcher, runs outgoing transfers on their
//! own tasks and reports what happens through [`SessionEvent`]s.

mod config;
mod dispatch;
mod events;
mod history;
mod sender;
mod shared;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::SHUTDOWN_GRACE;
use crate::error::{Error, Result};
use crate::protocol::{Codec, Frame, TextPayload, unix_millis};
use crate::pump::{CloseReason, CloseSignal, DuplexPump, OutboundSender, PumpHandle};
use crate::transfer::{AcceptPolicy, Direction, OutgoingTransfer, TransferHandle, track};

pub use config::SessionConfig;
pub use events::{SessionEvent, SessionEvents, SessionStatus};
pub use history::{ChatHistory, ChatLine, Origin};

use dispatch::Dispatcher;
use sender::OutgoingTask;
use shared::{Shared, lock};

/// One connection's chat and file-transfer state.
///
/// All methods take `&self`; share it behind an `Arc` to call
/// [`shutdown`](Self::shutdown) from another task.
#[derive(Debug)]
pub struct Session {
    shared: Arc<Shared>,
    outbound: OutboundSender,
    close: CloseSignal,
    pump: Mutex<Option<PumpHandle>>,
    sender_task: Mutex<Option<JoinHandle<()>>>,
    shutting_down: AtomicBool,
}

impl Session {
    /// Start a session over an established connection.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<S, P>(stream: S, config: SessionConfig, policy: P) -> Result<(Self, SessionEvents)>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        P: AcceptPolicy + 'static,
    {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pump = DuplexPump::new(Codec::new(config.max_frame_len), config.outbound_queue);
        let outbound = pump.outbound();
        let close = pump.close_signal();

        info!(
            username = %config.username,
            downloads = %config.downloads_dir.display(),
            chunk_size = config.chunk_size,
            "Session started"
        );
        let shared = Arc::new(Shared::new(config, events_tx));
        let dispatcher = Dispatcher::new(Arc::clone(&shared), outbound.clone(), Arc::new(policy));
        let pump = pump.start(stream, dispatcher);

        let session = Self {
            shared,
            outbound,
            close,
            pump: Mutex::new(Some(pump)),
            sender_task: Mutex::new(None),
            shutting_down: AtomicBool::new(false),
        };
        Ok((session, events_rx))
    }

    pub fn username(&self) -> &str {
        &self.shared.config.username
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn status(&self) -> SessionStatus {
        match self.close.reason() {
            None => SessionStatus::Connected,
            Some(reason) => SessionStatus::Disconnected(reason),
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.close.is_closed()
    }

    /// Send a chat line.
    ///
    /// Never waits: fails with [`Error::QueueFull`] if the outbound queue is
    /// at its bound and [`Error::Disconnected`] once the session has ended.
    pub fn send_text(&self, content: impl Into<String>) -> Result<()> {
        let payload = TextPayload {
            sender: self.shared.config.username.clone(),
            content: content.into(),
            timestamp: unix_millis(),
        };
        let line = ChatLine {
            sender: payload.sender.clone(),
            content: payload.content.clone(),
            timestamp: payload.timestamp,
            origin: Origin::Local,
        };
        self.outbound.try_send(Frame::Text(payload))?;
        self.shared.record(line);
        Ok(())
    }

    /// Offer a local file to the peer.
    ///
    /// Returns once the offer is queued; the transfer itself runs on its own
    /// task and is observed through the returned handle.
    pub async fn offer_file(&self, path: impl AsRef<Path>) -> Result<TransferHandle> {
        let path = path.as_ref();
        if self.close.is_closed() {
            return Err(Error::Disconnected);
        }
        self.ensure_free(Direction::Outgoing)?;

        let file =
            OutgoingTransfer::open(self.shared.next_id(), path, self.shared.config.chunk_size)
                .await?;
        let (tracker, handle) = track(file.transfer());
        let (decision_tx, decision_rx) = oneshot::channel();

        {
            let mut slots = lock(&self.shared.slots);
            if slots.is_busy(Direction::Outgoing) {
                return Err(Error::Busy {
                    direction: Direction::Outgoing,
                });
            }
            slots.outgoing = Some(handle.clone());
            slots.pending_decision = Some(decision_tx);
        }

        let offer = Frame::offer(
            file.transfer().filename(),
            file.transfer().total_size(),
            self.shared.config.username.as_str(),
        );
        if let Err(e) = self.outbound.try_send(offer) {
            let mut slots = lock(&self.shared.slots);
            slots.outgoing = None;
            slots.pending_decision = None;
            return Err(e);
        }
        info!(
            path = %path.display(),
            total = file.transfer().total_size(),
            "File offered"
        );

        let task = OutgoingTask {
            file,
            tracker,
            decision: decision_rx,
            outbound: self.outbound.clone(),
            close: self.close.clone(),
            shared: Arc::clone(&self.shared),
        };
        *lock(&self.sender_task) = Some(tokio::spawn(task.run()));
        Ok(handle)
    }

    /// The current or most recent transfer in `direction`.
    pub fn transfer(&self, direction: Direction) -> Option<TransferHandle> {
        lock(&self.shared.slots).get(direction).cloned()
    }

    /// All retained chat lines, oldest first.
    pub fn history(&self) -> Vec<ChatLine> {
        lock(&self.shared.history).snapshot()
    }

    /// The last `n` chat lines, oldest first.
    pub fn recent_history(&self, n: usize) -> Vec<ChatLine> {
        lock(&self.shared.history).recent(n)
    }

    /// End the session.
    ///
    /// Sends Disconnect (best effort), stops the pump and waits for it and any
    /// outgoing transfer task to wind down. Open transfers end Aborted. Safe
    /// to call more than once and from any task.
    pub async fn shutdown(&self) {
        let first = !self.shutting_down.swap(true, Ordering::SeqCst);
        if first && !self.close.is_closed() {
            match tokio::time::timeout(
                SHUTDOWN_GRACE,
                self.outbound.send_confirmed(Frame::Disconnect),
            )
            .await
            {
                Ok(Ok(())) => debug!("Disconnect sent"),
                Ok(Err(e)) => debug!(error = %e, "Disconnect not sent"),
                Err(_) => warn!("Timed out sending Disconnect"),
            }
        }
        self.close.close(CloseReason::LocalShutdown);

        let pump = lock(&self.pump).take();
        if let Some(pump) = pump {
            pump.join(SHUTDOWN_GRACE).await;
        }
        let task = lock(&self.sender_task).take();
        if let Some(mut task) = task {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("Outgoing transfer task did not stop in time, aborting");
                task.abort();
            }
        }
        debug!("Session shut down");
    }

    fn ensure_free(&self, direction: Direction) -> Result<()> {
        if lock(&self.shared.slots).is_busy(direction) {
            Err(Error::Busy { direction })
        } else {
            Ok(())
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Tasks observe this and stop; nothing is awaited here.
        self.close.close(CloseReason::LocalShutdown);
    }
}
