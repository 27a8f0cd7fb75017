//! Pad Service - the encryption daemon and its client
//!
//! The daemon accepts one TCP connection per request and hands each to an
//! isolated worker task. The client validates its inputs, runs the
//! control code / acknowledgement / payload exchange, and returns the
//! ciphertext.

pub mod client;
mod config;
mod error;
pub mod handler;
pub mod input;
pub mod supervisor;

pub use client::{ClientState, EncryptClient};
pub use config::*;
pub use error::*;
pub use handler::SessionOutcome;
pub use supervisor::{Daemon, DaemonStats};
