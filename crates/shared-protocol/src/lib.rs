//! Shared Protocol Definitions for the one-time-pad service
//!
//! This crate contains the alphabet, wire frames and session types shared
//! by the encryption daemon and its client.

pub mod alphabet;
mod error;
mod packets;
mod session;

pub use alphabet::AlphaText;
pub use error::*;
pub use packets::*;
pub use session::*;

/// Largest payload a peer may announce in a control code
pub const MAX_MESSAGE_SIZE: usize = 150_000;

/// Largest window handed to a single socket read or write
pub const TRANSFER_CHUNK_SIZE: usize = 1000;
