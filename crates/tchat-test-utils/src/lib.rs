//! tchat-test-utils: Test infrastructure for tchat.
//!
//! Provides:
//! - duplex_pair: In-memory connection for testing without network
//! - FaultyStream: Stream wrapper that fails reads or writes on demand
//! - RawPeer: Frame-level scripted peer for protocol tests
//! - Event helpers: bounded waits on a session's event stream

mod duplex;
mod events;
mod faulty;
mod raw_peer;

pub use duplex::{DUPLEX_BUFFER, duplex_pair, faulty_pair};
pub use events::{EVENT_TIMEOUT, drain_events, next_event, wait_for_event};
pub use faulty::{FaultHandle, FaultyStream};
pub use raw_peer::RawPeer;
