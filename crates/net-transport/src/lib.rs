//! Network Transport - exact-length framing over TCP byte streams
//!
//! Delivers whole messages over streams that may complete any read or write
//! partially, and provides the acknowledgement exchange that keeps both
//! sides of the handshake in step.

mod config;
mod error;
mod transport;

pub use config::*;
pub use error::*;
pub use transport::*;

/// Default daemon port
pub const DEFAULT_PORT: u16 = 57171;
