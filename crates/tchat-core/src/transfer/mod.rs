//! File transfer: state machine, local storage and receiver policy.
//!
//! This module provides:
//! - [`Transfer`] bookkeeping and its state machine
//! - [`IncomingTransfer`] / [`OutgoingTransfer`], which own the destination
//!   and source files
//! - [`AcceptPolicy`] and the collision / partial-file decisions
//! - [`TransferHandle`] for observing a transfer from outside its task

mod handle;
mod incoming;
mod naming;
mod outgoing;
mod policy;
mod state;

pub use handle::{TransferHandle, TransferTracker, track};
pub use incoming::IncomingTransfer;
pub use naming::{open_destination, sanitize_filename};
pub use outgoing::OutgoingTransfer;
pub use policy::{AcceptPolicy, AutoAccept, CollisionPolicy, MaxSize, PartialFilePolicy, RejectAll};
pub use state::{Direction, Transfer, TransferInfo, TransferState};
