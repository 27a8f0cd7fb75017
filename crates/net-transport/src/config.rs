//! Transport configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_protocol::{MAX_MESSAGE_SIZE, TRANSFER_CHUNK_SIZE};

/// Framing and acknowledgement settings shared by both peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest window handed to one read or write call
    pub chunk_size: usize,
    /// Largest message accepted by a length-bounded receive
    pub max_message_size: usize,
    /// How many times to wait for an acknowledgement
    pub ack_retries: u32,
    /// How long each acknowledgement wait lasts, in milliseconds
    pub ack_interval_ms: u64,
}

impl TransportConfig {
    pub fn ack_interval(&self) -> Duration {
        Duration::from_millis(self.ack_interval_ms)
    }

    /// Upper bound on the whole acknowledgement wait
    pub fn ack_budget(&self) -> Duration {
        self.ack_interval() * self.ack_retries
    }

    pub(crate) fn window(&self) -> usize {
        self.chunk_size.max(1)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chunk_size: TRANSFER_CHUNK_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
            ack_retries: 3,
            ack_interval_ms: 1000,
        }
    }
}
