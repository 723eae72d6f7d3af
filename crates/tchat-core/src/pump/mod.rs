//! Duplex pump: one reader task and one writer task per connection.
//!
//! The reader decodes frames and hands them, in receipt order, to a
//! [`FrameHandler`]. The writer drains a bounded FIFO queue fed through
//! [`OutboundSender`] clones. Either side failing sets the shared
//! [`CloseSignal`]; the other side observes it and stops, and the handler's
//! `on_close` runs exactly once.

mod close;
mod outbound;

use std::future::Future;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::constants::{READ_BUFFER_SIZE, SHUTDOWN_GRACE};
use crate::error::Result;
use crate::protocol::{Codec, Frame};

pub use close::{CloseReason, CloseSignal};
pub use outbound::OutboundSender;

use outbound::{LaneSizes, Outbound};

/// What the reader does after a frame has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// End the session with this reason.
    Stop(CloseReason),
}

/// Inbound dispatch target.
///
/// An `Err` from `on_frame` ends the session with a reason derived from the
/// error's class.
pub trait FrameHandler: Send + 'static {
    fn on_frame(&mut self, frame: Frame) -> impl Future<Output = Result<Flow>> + Send;

    /// Called once, after the reader has stopped, with the winning reason.
    fn on_close(&mut self, reason: &CloseReason) -> impl Future<Output = ()> + Send;
}

/// A pump that has its queue but no connection yet.
///
/// Producers can be handed out (and built into the handler) before
/// [`start`](Self::start) attaches the stream.
#[derive(Debug)]
pub struct DuplexPump {
    codec: Codec,
    outbound: OutboundSender,
    rx: mpsc::Receiver<Outbound>,
    close: CloseSignal,
}

impl DuplexPump {
    /// `capacity` bounds the queue. Two slots are held back for protocol
    /// replies and Disconnect; chat and file data split the rest.
    pub fn new(codec: Codec, capacity: usize) -> Self {
        let sizes = LaneSizes::split(capacity);
        let (tx, rx) = mpsc::channel(sizes.total());
        let close = CloseSignal::new();
        Self {
            codec,
            outbound: OutboundSender::new(tx, sizes, codec, close.clone()),
            rx,
            close,
        }
    }

    pub fn outbound(&self) -> OutboundSender {
        self.outbound.clone()
    }

    pub fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }

    /// Split `stream` and spawn the reader and writer tasks.
    pub fn start<S, H>(self, stream: S, handler: H) -> PumpHandle
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        H: FrameHandler,
    {
        let (reader, writer) = tokio::io::split(stream);
        let reader = tokio::spawn(read_loop(reader, self.codec, handler, self.close.clone()));
        let writer = tokio::spawn(write_loop(writer, self.rx, self.close));
        PumpHandle { reader, writer }
    }
}

/// Join handles of a running pump.
#[derive(Debug)]
pub struct PumpHandle {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl PumpHandle {
    /// Wait up to `grace` for both tasks, aborting whichever is still running.
    ///
    /// The close signal must already be set or the tasks will not stop.
    pub async fn join(self, grace: Duration) {
        let deadline = tokio::time::Instant::now() + grace;
        for (name, mut task) in [("reader", self.reader), ("writer", self.writer)] {
            if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
                warn!(task = name, "Pump task did not stop in time, aborting");
                task.abort();
            }
        }
    }
}

async fn read_loop<R, H>(mut reader: R, codec: Codec, mut handler: H, close: CloseSignal)
where
    R: AsyncRead + Unpin,
    H: FrameHandler,
{
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    let reason = loop {
        if let Some(reason) = close.reason() {
            break reason;
        }

        // Drain everything already buffered before reading again.
        match codec.decode(&mut buf) {
            Ok(Some(frame)) => {
                trace!(kind = %frame.kind(), "Frame received");
                match handler.on_frame(frame).await {
                    Ok(Flow::Continue) => continue,
                    Ok(Flow::Stop(reason)) => break reason,
                    Err(e) => {
                        debug!(error = %e, "Frame handler failed");
                        break CloseReason::from_error(&e);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Inbound frame rejected");
                break CloseReason::from_error(&e);
            }
        }

        buf.reserve(READ_BUFFER_SIZE);
        tokio::select! {
            reason = close.closed() => break reason,
            read = reader.read_buf(&mut buf) => match read {
                Ok(0) => break CloseReason::PeerClosed,
                Ok(n) => trace!(bytes = n, "Read from connection"),
                Err(e) => break CloseReason::Transport(e.to_string()),
            },
        }
    };

    close.close(reason.clone());
    let reason = close.reason().unwrap_or(reason);
    debug!(%reason, "Reader stopped");
    handler.on_close(&reason).await;
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<Outbound>, close: CloseSignal)
where
    W: AsyncWrite + Unpin,
{
    loop {
        let outbound = tokio::select! {
            biased;
            _ = close.closed() => break,
            next = rx.recv() => match next {
                Some(outbound) => outbound,
                None => break,
            },
        };

        // A peer that stops reading must not pin the writer past close.
        let written = tokio::select! {
            biased;
            _ = close.closed() => break,
            written = write_frame(&mut writer, &outbound.bytes) => written,
        };
        if let Err(e) = written {
            warn!(kind = %outbound.kind, error = %e, "Write failed");
            close.close(CloseReason::Transport(e.to_string()));
            break;
        }
        trace!(kind = %outbound.kind, bytes = outbound.bytes.len(), "Frame written");
        if let Some(notify) = outbound.written {
            let _ = notify.send(());
        }
    }

    // Anything still queued is dropped unwritten.
    rx.close();
    let dropped = std::iter::from_fn(|| rx.try_recv().ok()).count();
    if dropped > 0 {
        debug!(dropped, "Discarded queued frames");
    }
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, writer.shutdown()).await;
    debug!("Writer stopped");
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}
