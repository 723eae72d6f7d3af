//! Producer side of the outbound queue.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError, mpsc, oneshot};

use crate::constants::CONTROL_QUEUE_RESERVE;
use crate::error::{Error, Result};
use crate::protocol::{Codec, Frame, FrameKind};
use crate::pump::CloseSignal;

/// Share of the queue a frame draws from.
///
/// All lanes feed the same FIFO; the lanes only bound how many frames of
/// each kind may be waiting at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lane {
    /// Text and file offers.
    Chat,
    /// File chunks and the end marker.
    Bulk,
    /// Replies to the peer and Disconnect.
    Control,
}

impl Lane {
    pub(crate) fn of(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Text | FrameKind::FileOffer => Lane::Chat,
            FrameKind::FileChunk | FrameKind::FileEnd => Lane::Bulk,
            FrameKind::FileAccept | FrameKind::FileReject | FrameKind::Disconnect => Lane::Control,
        }
    }
}

/// Slots per lane for a queue of `capacity` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LaneSizes {
    pub(crate) chat: usize,
    pub(crate) bulk: usize,
    pub(crate) control: usize,
}

impl LaneSizes {
    /// Control keeps its reserve; chat and file data split the rest.
    pub(crate) fn split(capacity: usize) -> Self {
        let control = CONTROL_QUEUE_RESERVE;
        let rest = capacity.saturating_sub(control);
        let bulk = (rest / 2).max(1);
        let chat = rest.saturating_sub(bulk).max(1);
        Self {
            chat,
            bulk,
            control,
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.chat + self.bulk + self.control
    }
}

/// An encoded frame waiting for the writer.
#[derive(Debug)]
pub(crate) struct Outbound {
    pub(crate) kind: FrameKind,
    pub(crate) bytes: Bytes,
    /// Lane slot, held until the frame is written or discarded.
    _permit: OwnedSemaphorePermit,
    /// Notified once the frame is on the connection.
    pub(crate) written: Option<oneshot::Sender<()>>,
}

/// Cloneable handle for enqueueing frames.
///
/// Frames are encoded here, on the caller's side, so an unencodable frame is
/// reported to the caller and never reaches the queue.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::Sender<Outbound>,
    chat: Arc<Semaphore>,
    bulk: Arc<Semaphore>,
    control: Arc<Semaphore>,
    codec: Codec,
    close: CloseSignal,
}

impl OutboundSender {
    /// `tx` must have room for `sizes.total()` frames.
    pub(crate) fn new(
        tx: mpsc::Sender<Outbound>,
        sizes: LaneSizes,
        codec: Codec,
        close: CloseSignal,
    ) -> Self {
        Self {
            tx,
            chat: Arc::new(Semaphore::new(sizes.chat)),
            bulk: Arc::new(Semaphore::new(sizes.bulk)),
            control: Arc::new(Semaphore::new(sizes.control)),
            codec,
            close,
        }
    }

    fn lane(&self, kind: FrameKind) -> &Arc<Semaphore> {
        match Lane::of(kind) {
            Lane::Chat => &self.chat,
            Lane::Bulk => &self.bulk,
            Lane::Control => &self.control,
        }
    }

    fn encode(&self, frame: &Frame) -> Result<Bytes> {
        self.codec.encode(frame).map_err(|e| match e {
            Error::FrameTooLarge { len, max } => Error::OversizeFrame { len, max },
            other => other,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.close.is_closed() {
            Err(Error::Disconnected)
        } else {
            Ok(())
        }
    }

    /// Wait for a slot in the frame's lane, giving up when the session closes.
    async fn acquire(&self, kind: FrameKind) -> Result<OwnedSemaphorePermit> {
        let lane = Arc::clone(self.lane(kind));
        tokio::select! {
            permit = lane.acquire_owned() => permit.map_err(|_| Error::Disconnected),
            _ = self.close.closed() => Err(Error::Disconnected),
        }
    }

    async fn enqueue(&self, outbound: Outbound) -> Result<()> {
        self.tx.send(outbound).await.map_err(|_| Error::Disconnected)
    }

    /// Enqueue without waiting.
    ///
    /// Fails with [`Error::QueueFull`] when the frame's lane is at its bound
    /// and [`Error::Disconnected`] once the session has closed.
    pub fn try_send(&self, frame: Frame) -> Result<()> {
        self.ensure_open()?;
        let kind = frame.kind();
        let bytes = self.encode(&frame)?;
        let permit = Arc::clone(self.lane(kind))
            .try_acquire_owned()
            .map_err(|e| match e {
                TryAcquireError::NoPermits => Error::QueueFull,
                TryAcquireError::Closed => Error::Disconnected,
            })?;
        let outbound = Outbound {
            kind,
            bytes,
            _permit: permit,
            written: None,
        };
        self.tx.try_send(outbound).map_err(|e| match e {
            TrySendError::Full(_) => Error::QueueFull,
            TrySendError::Closed(_) => Error::Disconnected,
        })
    }

    /// Enqueue, waiting for room in the frame's lane.
    ///
    /// Returns [`Error::Disconnected`] if the session closes while waiting.
    pub async fn send(&self, frame: Frame) -> Result<()> {
        self.ensure_open()?;
        let kind = frame.kind();
        let bytes = self.encode(&frame)?;
        let permit = self.acquire(kind).await?;
        self.enqueue(Outbound {
            kind,
            bytes,
            _permit: permit,
            written: None,
        })
        .await
    }

    /// Enqueue and wait until the writer has put the frame on the connection.
    pub async fn send_confirmed(&self, frame: Frame) -> Result<()> {
        self.ensure_open()?;
        let kind = frame.kind();
        let bytes = self.encode(&frame)?;
        let permit = self.acquire(kind).await?;
        let (written_tx, written_rx) = oneshot::channel();
        self.enqueue(Outbound {
            kind,
            bytes,
            _permit: permit,
            written: Some(written_tx),
        })
        .await?;
        // Dropped unwritten when the writer stops.
        written_rx.await.map_err(|_| Error::Disconnected)
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_closed()
    }
}
