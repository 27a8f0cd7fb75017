//! Error types for the protocol

use thiserror::Error;

/// Protocol error
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid symbol {byte:#04x} at position {position}")]
    InvalidSymbol { position: usize, byte: u8 },

    #[error("Invalid role tag: {0:?}")]
    InvalidRoleTag(String),

    #[error("Role mismatch: expected {expected:?}, got {actual:?}")]
    RoleMismatch { expected: String, actual: String },

    #[error("Malformed control code: {0}")]
    MalformedControlCode(String),

    #[error("Control code too large: {size} bytes (max: {max})")]
    ControlCodeTooLarge { size: usize, max: usize },

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Payload is missing the key delimiter")]
    MissingKeyDelimiter,

    #[error("Payload is missing the end delimiter")]
    MissingEndDelimiter,

    #[error("Key too short: {key_len} symbols for {plaintext_len} symbols of plaintext")]
    KeyTooShort { key_len: usize, plaintext_len: usize },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        from: crate::HandshakeState,
        to: crate::HandshakeState,
    },
}

/// Result type alias for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
