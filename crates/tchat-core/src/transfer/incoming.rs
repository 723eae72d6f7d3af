//! Receiving side of a transfer: owns the destination file.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::error::Result;
use crate::transfer::naming::open_destination;
use crate::transfer::{CollisionPolicy, Direction, PartialFilePolicy, Transfer};

/// An accepted incoming transfer and its open destination.
///
/// The sink is released exactly once, by [`finish`](Self::finish) or
/// [`abort`](Self::abort), whichever comes first.
#[derive(Debug)]
pub struct IncomingTransfer {
    transfer: Transfer,
    path: PathBuf,
    sink: Option<BufWriter<File>>,
    partial: PartialFilePolicy,
}

impl IncomingTransfer {
    /// Accept `transfer` (which must be Offered) and open its destination
    /// under `dir`, creating the directory if needed.
    pub async fn create(
        mut transfer: Transfer,
        dir: &Path,
        collision: CollisionPolicy,
        partial: PartialFilePolicy,
    ) -> Result<Self> {
        debug_assert_eq!(transfer.direction(), Direction::Incoming);
        fs::create_dir_all(dir).await?;
        let (path, file) = open_destination(dir, transfer.filename(), collision).await?;
        transfer.accept()?;
        debug!(path = %path.display(), total = transfer.total_size(), "Destination opened");

        Ok(Self {
            transfer,
            path,
            sink: Some(BufWriter::new(file)),
            partial,
        })
    }

    pub fn transfer(&self) -> &Transfer {
        &self.transfer
    }

    /// Where the data is being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepted -> Active.
    pub fn activate(&mut self) -> Result<()> {
        self.transfer.activate()
    }

    /// Append a chunk at the current offset.
    ///
    /// An overrun of the declared size is a protocol error; nothing is
    /// written in that case.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        self.transfer.record_chunk(data.len() as u64)?;
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(data).await?;
        }
        Ok(())
    }

    /// Flush and close the destination, then mark the transfer Completed.
    pub async fn finish(&mut self) -> Result<()> {
        if let Some(mut sink) = self.sink.take() {
            sink.flush().await?;
            sink.into_inner().sync_all().await?;
        }
        if self.transfer.bytes_transferred() < self.transfer.total_size() {
            warn!(
                filename = %self.transfer.filename(),
                bytes = self.transfer.bytes_transferred(),
                total = self.transfer.total_size(),
                "FileEnd before declared size"
            );
        }
        self.transfer.complete()
    }

    /// Abort the transfer and release the destination.
    ///
    /// Returns false if the transfer had already reached a terminal state.
    /// Under [`PartialFilePolicy::Delete`] the partial file is removed.
    pub async fn abort(&mut self, reason: &str) -> bool {
        if !self.transfer.abort(reason) {
            return false;
        }
        let sink = self.sink.take();
        if self.partial == PartialFilePolicy::Keep {
            if let Some(mut sink) = sink {
                if let Err(e) = sink.flush().await {
                    warn!(path = %self.path.display(), error = %e, "Failed to flush partial file");
                }
            }
        } else {
            // Close before removing.
            drop(sink);
            if let Err(e) = fs::remove_file(&self.path).await {
                warn!(path = %self.path.display(), error = %e, "Failed to remove partial file");
            }
        }
        true
    }
}
