//! tchat-core: protocol engine for tchat.
//!
//! This crate provides:
//! - Frame definitions and the length-prefixed wire codec
//! - The per-file transfer state machine and local storage handling
//! - The duplex pump that multiplexes chat and file data over one stream
//! - The session controller that applies protocol policy
//! - Logging setup

pub mod constants;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod pump;
pub mod session;
pub mod transfer;

pub use error::{Error, ErrorClass, Result};
pub use logging::{LogFormat, init_logging};
pub use protocol::{Codec, Frame, FrameKind};
pub use session::{ChatLine, Session, SessionConfig, SessionEvent, SessionEvents, SessionStatus};
pub use transfer::{
    AcceptPolicy, AutoAccept, CollisionPolicy, Direction, MaxSize, PartialFilePolicy, RejectAll,
    TransferHandle, TransferInfo, TransferState,
};
