//! Service error types

use net_transport::TransportError;
use pad_cipher::CipherError;
use shared_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Could not connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Key too short: {key_len} symbols for {plaintext_len} symbols of plaintext")]
    KeyTooShort { key_len: usize, plaintext_len: usize },

    #[error("{addr} did not acknowledge the control code")]
    AckTimeout { addr: String },

    #[error("{label} contains invalid characters: {reason}")]
    InvalidInput { label: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
