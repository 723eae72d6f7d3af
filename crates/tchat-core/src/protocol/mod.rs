//! Protocol module for the tchat wire format.
//!
//! This module provides:
//! - Frame types and payloads
//! - Length-prefixed bincode codec

mod codec;
mod frame;

#[cfg(test)]
mod proptest;

pub use codec::Codec;
pub use frame::*;
