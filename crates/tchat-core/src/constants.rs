//! Protocol and configuration constants for tchat.

use std::time::Duration;

// =============================================================================
// Protocol Constants
// =============================================================================

/// Length of the frame header (4 bytes, little-endian u32).
pub const FRAME_HEADER_LEN: usize = 4;

/// Default upper bound on a single encoded frame payload (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Bytes a `FileChunk` frame adds on top of its data (variant tag + length).
pub const CHUNK_FRAME_OVERHEAD: usize = 16;

// =============================================================================
// Transfer Constants
// =============================================================================

/// Default file chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default largest file accepted from a peer (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Destination name used when an offered filename sanitizes to nothing.
pub const FALLBACK_FILENAME: &str = "received_file";

/// Longest destination filename, in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

/// Highest ` (n)` suffix tried before giving up on a colliding name.
pub const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Progress events are emitted each time a transfer crosses this many percent.
pub const PROGRESS_STEP_PERCENT: u8 = 10;

/// Reject reason sent while an incoming transfer is already active.
pub const REJECT_BUSY: &str = "busy";

/// Reject reason sent when an offer exceeds the size limit.
pub const REJECT_TOO_LARGE: &str = "file too large";

/// Reject reason sent when the accept policy declines an offer.
pub const REJECT_DECLINED: &str = "declined";

/// Reject reason sent when the destination cannot be created.
pub const REJECT_UNWRITABLE: &str = "cannot create destination";

// =============================================================================
// Session Constants
// =============================================================================

/// Default outbound queue bound, in frames.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Queue slots only protocol replies and Disconnect may use.
pub const CONTROL_QUEUE_RESERVE: usize = 2;

/// Smallest outbound queue: the control reserve plus one slot each for chat
/// and file data.
pub const MIN_OUTBOUND_QUEUE: usize = CONTROL_QUEUE_RESERVE + 2;

/// Default number of chat lines kept for back-scroll.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Read buffer size for the inbound side of the pump.
pub const READ_BUFFER_SIZE: usize = 8 * 1024;

/// How long shutdown waits for the Disconnect frame and the pump tasks.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// =============================================================================
// Default Values
// =============================================================================

/// Default TCP port.
pub const DEFAULT_TCP_PORT: u16 = 8888;

/// Default host for client mode.
pub const DEFAULT_HOST: &str = "localhost";

/// Downloads directory, relative to the home directory.
pub const DEFAULT_DOWNLOADS_SUBDIR: &str = "Downloads/TerminalChat";

/// Username used when none is configured and `$USER` is unset.
pub const DEFAULT_USERNAME: &str = "Unknown";
