//! Sending side of a transfer: owns the source file.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

use crate::constants::FALLBACK_FILENAME;
use crate::error::{Error, Result};
use crate::transfer::{Direction, Transfer};

/// A local file being offered to the peer.
#[derive(Debug)]
pub struct OutgoingTransfer {
    transfer: Transfer,
    path: PathBuf,
    source: Option<File>,
    chunk_size: usize,
}

impl OutgoingTransfer {
    /// Open `path` for sending in `chunk_size` pieces.
    ///
    /// Anything that is not a readable regular file is [`Error::NotFound`].
    pub async fn open(id: u64, path: &Path, chunk_size: usize) -> Result<Self> {
        let not_found = || Error::NotFound {
            path: path.to_path_buf(),
        };

        let meta = fs::metadata(path).await.map_err(|_| not_found())?;
        if !meta.is_file() {
            return Err(not_found());
        }
        let source = File::open(path).await.map_err(|_| not_found())?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

        Ok(Self {
            transfer: Transfer::new(id, Direction::Outgoing, filename, meta.len()),
            path: path.to_path_buf(),
            source: Some(source),
            chunk_size,
        })
    }

    pub fn transfer(&self) -> &Transfer {
        &self.transfer
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Peer accepted: Offered -> Accepted -> Active.
    pub fn start(&mut self) -> Result<()> {
        self.transfer.accept()?;
        self.transfer.activate()
    }

    /// Peer declined.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<()> {
        self.source = None;
        self.transfer.reject(reason)
    }

    /// Read the next chunk, or `None` once `total_size` bytes have been read.
    ///
    /// Every chunk is `chunk_size` bytes except possibly the last.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let remaining = self.transfer.total_size() - self.transfer.bytes_transferred();
        if remaining == 0 {
            return Ok(None);
        }
        let Some(source) = self.source.as_mut() else {
            return Err(Error::InvalidState {
                expected: "open source".into(),
                actual: self.transfer.state().to_string(),
            });
        };

        let len = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; len];
        source.read_exact(&mut buf).await?;
        self.transfer.record_chunk(len as u64)?;
        Ok(Some(buf))
    }

    /// All data sent and FileEnd written: Active -> Completed.
    pub fn finish(&mut self) -> Result<()> {
        self.source = None;
        self.transfer.complete()
    }

    /// Returns false if already terminal.
    pub fn abort(&mut self, reason: &str) -> bool {
        self.source = None;
        self.transfer.abort(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferState;

    fn source_file(dir: &Path, len: usize) -> PathBuf {
        let path = dir.join("source.bin");
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn chunks_ten_thousand_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = source_file(dir.path(), 10_000);
        let mut outgoing = OutgoingTransfer::open(1, &path, 1024).await.unwrap();
        assert_eq!(outgoing.transfer().filename(), "source.bin");
        assert_eq!(outgoing.transfer().total_size(), 10_000);
        outgoing.start().unwrap();

        let mut sizes = Vec::new();
        let mut joined = Vec::new();
        while let Some(chunk) = outgoing.next_chunk().await.unwrap() {
            sizes.push(chunk.len());
            joined.extend_from_slice(&chunk);
        }

        let mut expected = vec![1024; 9];
        expected.push(784);
        assert_eq!(sizes, expected);
        assert_eq!(joined, std::fs::read(&path).unwrap());

        outgoing.finish().unwrap();
        assert_eq!(outgoing.transfer().state(), TransferState::Completed);
    }

    #[tokio::test]
    async fn empty_file_has_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = source_file(dir.path(), 0);
        let mut outgoing = OutgoingTransfer::open(2, &path, 1024).await.unwrap();
        outgoing.start().unwrap();
        assert!(outgoing.next_chunk().await.unwrap().is_none());
        outgoing.finish().unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = OutgoingTransfer::open(3, &dir.path().join("missing"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = OutgoingTransfer::open(4, dir.path(), 1024).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn reject_releases_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = source_file(dir.path(), 10);
        let mut outgoing = OutgoingTransfer::open(5, &path, 4).await.unwrap();
        outgoing.reject("declined").unwrap();
        assert_eq!(outgoing.transfer().state(), TransferState::Rejected);
        assert!(!outgoing.abort("late"));
    }
}
