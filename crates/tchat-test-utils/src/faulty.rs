//! Fault injection for stream connections.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Default)]
struct Faults {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Reader parked in `poll_read`, woken when a read fault is injected.
    read_waker: Mutex<Option<Waker>>,
}

impl Faults {
    fn park_reader(&self, waker: &Waker) {
        *self.read_waker.lock().unwrap_or_else(|e| e.into_inner()) = Some(waker.clone());
    }

    fn wake_reader(&self) {
        let waker = self
            .read_waker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Controls a [`FaultyStream`] from the test.
#[derive(Debug, Clone)]
pub struct FaultHandle {
    faults: Arc<Faults>,
}

impl FaultHandle {
    /// Make every pending and future read fail with `ConnectionReset`.
    pub fn fail_reads(&self) {
        self.faults.fail_reads.store(true, Ordering::SeqCst);
        self.faults.wake_reader();
    }

    /// Make every future write fail with `BrokenPipe`.
    pub fn fail_writes(&self) {
        self.faults.fail_writes.store(true, Ordering::SeqCst);
    }
}

/// Stream wrapper whose reads or writes can be made to fail.
#[derive(Debug)]
pub struct FaultyStream<S> {
    inner: S,
    faults: Arc<Faults>,
}

impl<S> FaultyStream<S> {
    pub fn new(inner: S) -> (Self, FaultHandle) {
        let faults = Arc::new(Faults::default());
        let handle = FaultHandle {
            faults: Arc::clone(&faults),
        };
        (Self { inner, faults }, handle)
    }

    fn read_fault(&self) -> Option<io::Error> {
        self.faults
            .fail_reads
            .load(Ordering::SeqCst)
            .then(|| io::Error::new(io::ErrorKind::ConnectionReset, "injected read failure"))
    }

    fn write_fault(&self) -> Option<io::Error> {
        self.faults
            .fail_writes
            .load(Ordering::SeqCst)
            .then(|| io::Error::new(io::ErrorKind::BrokenPipe, "injected write failure"))
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for FaultyStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(err) = this.read_fault() {
            return Poll::Ready(Err(err));
        }
        this.faults.park_reader(cx.waker());
        // Re-check so a fault injected while parking is not missed.
        if let Some(err) = this.read_fault() {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for FaultyStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Some(err) = this.write_fault() {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(err) = this.write_fault() {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
