//! Pad Cipher - modular-addition transform over the 27-symbol alphabet
//!
//! Provides the encode transform used by the daemon and the key material
//! type both sides hand around.

mod error;
mod pad;

pub use error::*;
pub use pad::*;

/// Alphabet size the transform works modulo
pub const MODULUS: u8 = shared_protocol::alphabet::ALPHABET_LEN;
