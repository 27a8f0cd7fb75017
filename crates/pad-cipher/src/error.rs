//! Cipher error types

use shared_protocol::ProtocolError;
use thiserror::Error;

/// Pad cipher error
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Key too short: {key_len} symbols for {plaintext_len} symbols of plaintext")]
    KeyTooShort { key_len: usize, plaintext_len: usize },

    #[error("Invalid key material: {0}")]
    InvalidKey(#[source] ProtocolError),
}

pub type CipherResult<T> = Result<T, CipherError>;
