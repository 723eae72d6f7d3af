//! Session configuration.

use std::path::PathBuf;

use crate::constants::{
    CHUNK_FRAME_OVERHEAD, DEFAULT_CHUNK_SIZE, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_FRAME_LEN, DEFAULT_OUTBOUND_QUEUE, DEFAULT_USERNAME, MIN_OUTBOUND_QUEUE,
};
use crate::error::{Error, Result};
use crate::transfer::{CollisionPolicy, PartialFilePolicy};

/// Settings for one [`Session`](super::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name stamped on outgoing text and offers.
    pub username: String,
    /// Where received files are written.
    pub downloads_dir: PathBuf,
    /// Bytes per FileChunk frame.
    pub chunk_size: usize,
    /// Largest encoded frame accepted or sent.
    pub max_frame_len: usize,
    /// Largest incoming file accepted.
    pub max_file_size: u64,
    /// Outbound queue bound, in frames.
    pub outbound_queue: usize,
    /// Chat lines kept in history.
    pub history_limit: usize,
    pub collision: CollisionPolicy,
    pub partial_files: PartialFilePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            downloads_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            history_limit: DEFAULT_HISTORY_LIMIT,
            collision: CollisionPolicy::default(),
            partial_files: PartialFilePolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Create a config with default values.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads_dir = dir.into();
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn with_outbound_queue(mut self, frames: usize) -> Self {
        self.outbound_queue = frames;
        self
    }

    pub fn with_history_limit(mut self, lines: usize) -> Self {
        self.history_limit = lines;
        self
    }

    pub fn with_collision(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    pub fn with_partial_files(mut self, policy: PartialFilePolicy) -> Self {
        self.partial_files = policy;
        self
    }

    /// Check the settings are usable together.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk size must be at least 1 byte".into(),
            });
        }
        // The length prefix is a u32.
        if u32::try_from(self.max_frame_len).is_err() {
            return Err(Error::Config {
                message: format!(
                    "frame limit {} exceeds the 4-byte length prefix",
                    self.max_frame_len
                ),
            });
        }
        if self.chunk_size.saturating_add(CHUNK_FRAME_OVERHEAD) > self.max_frame_len {
            return Err(Error::Config {
                message: format!(
                    "chunk size {} does not fit in a {}-byte frame",
                    self.chunk_size, self.max_frame_len
                ),
            });
        }
        if self.outbound_queue < MIN_OUTBOUND_QUEUE {
            return Err(Error::Config {
                message: format!("outbound queue must hold at least {MIN_OUTBOUND_QUEUE} frames"),
            });
        }
        Ok(())
    }
}
