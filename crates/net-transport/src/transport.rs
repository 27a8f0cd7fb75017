//! Framed stream over an async byte stream

use bytes::{Bytes, BytesMut};
use shared_protocol::{ACK_TOKEN, find};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{TransportConfig, TransportError, TransportResult};

/// Result of waiting for the peer's acknowledgement token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Acknowledged,
    NotAcknowledged,
}

/// Message-level I/O on top of a stream that may transfer any amount of
/// bytes per call
pub struct FramedStream<S> {
    stream: S,
    config: TransportConfig,
    bytes_sent: u64,
    bytes_received: u64,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: TransportConfig) -> Self {
        Self {
            stream,
            config,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Write every byte of `payload`, at most one chunk per write call
    pub async fn send_exact(&mut self, payload: &[u8]) -> TransportResult<()> {
        let window = self.config.window();
        let mut sent = 0;

        while sent < payload.len() {
            let end = payload.len().min(sent + window);
            let n = self.stream.write(&payload[sent..end]).await?;
            if n == 0 {
                return Err(TransportError::PeerClosed { transferred: sent });
            }
            sent += n;
            trace!("Wrote {} of {} bytes", sent, payload.len());
        }

        self.stream.flush().await?;
        self.bytes_sent += sent as u64;
        debug!(bytes = sent, "Sent message");
        Ok(())
    }

    /// Read exactly `len` bytes
    ///
    /// Lengths above the configured maximum are refused before any byte is
    /// read.
    pub async fn recv_exact(&mut self, len: usize) -> TransportResult<Bytes> {
        if len > self.config.max_message_size {
            return Err(TransportError::MessageTooLarge {
                size: len,
                max: self.config.max_message_size,
            });
        }

        let window = self.config.window();
        let mut buf = BytesMut::zeroed(len);
        let mut received = 0;

        while received < len {
            let end = len.min(received + window);
            let n = self.stream.read(&mut buf[received..end]).await?;
            if n == 0 {
                return Err(TransportError::PeerClosed {
                    transferred: received,
                });
            }
            received += n;
        }

        self.bytes_received += received as u64;
        debug!(bytes = received, "Received message");
        Ok(buf.freeze())
    }

    /// Read until `marker` appears, returning the bytes before it
    ///
    /// Never reads more than `budget` bytes from the stream. Bytes that
    /// arrived after the marker in the same read are discarded.
    pub async fn recv_until(&mut self, marker: &[u8], budget: usize) -> TransportResult<Bytes> {
        let window = self.config.window();
        let overlap = marker.len().saturating_sub(1);
        let mut buf = BytesMut::with_capacity(budget.min(window));
        let mut chunk = vec![0u8; window];

        loop {
            if buf.len() >= budget {
                warn!("No end marker within {} bytes", budget);
                return Err(TransportError::MarkerNotFound { budget });
            }

            let want = window.min(budget - buf.len());
            let n = self.stream.read(&mut chunk[..want]).await?;
            if n == 0 {
                return Err(TransportError::PeerClosed {
                    transferred: buf.len(),
                });
            }
            self.bytes_received += n as u64;

            // Marker may straddle the previous read
            let scan_from = buf.len().saturating_sub(overlap);
            buf.extend_from_slice(&chunk[..n]);

            if let Some(pos) = find(&buf[scan_from..], marker) {
                buf.truncate(scan_from + pos);
                debug!(bytes = buf.len(), "Received delimited message");
                return Ok(buf.freeze());
            }
        }
    }

    /// Single read of at most `capacity` bytes
    pub async fn recv_short(&mut self, capacity: usize) -> TransportResult<Bytes> {
        let mut buf = BytesMut::zeroed(capacity);
        let n = self.stream.read(&mut buf).await?;
        if n == 0 && capacity > 0 {
            return Err(TransportError::PeerClosed { transferred: 0 });
        }
        buf.truncate(n);
        self.bytes_received += n as u64;
        Ok(buf.freeze())
    }

    /// Send the acknowledgement token
    pub async fn send_ack(&mut self) -> TransportResult<()> {
        self.send_exact(ACK_TOKEN).await
    }

    /// Wait for the acknowledgement token
    ///
    /// Makes up to `ack_retries` waits of `ack_interval` each. A peer that
    /// closes, fails the read or answers with anything other than the token
    /// is reported as `NotAcknowledged`.
    pub async fn get_ack(&mut self) -> TransportResult<AckStatus> {
        let mut token = [0u8; ACK_TOKEN.len()];
        let mut filled = 0;

        for attempt in 1..=self.config.ack_retries {
            let read = self.stream.read(&mut token[filled..]);
            match timeout(self.config.ack_interval(), read).await {
                Err(_) => {
                    debug!("No acknowledgement yet (attempt {})", attempt);
                }
                Ok(Ok(0)) => {
                    debug!("Peer closed before acknowledging");
                    return Ok(AckStatus::NotAcknowledged);
                }
                Ok(Ok(n)) => {
                    self.bytes_received += n as u64;
                    filled += n;
                    if filled == token.len() {
                        if &token == ACK_TOKEN {
                            return Ok(AckStatus::Acknowledged);
                        }
                        warn!("Unexpected acknowledgement token: {:?}", token);
                        return Ok(AckStatus::NotAcknowledged);
                    }
                }
                Ok(Err(e)) => {
                    debug!("Connection failed before acknowledging: {}", e);
                    return Ok(AckStatus::NotAcknowledged);
                }
            }
        }

        Ok(AckStatus::NotAcknowledged)
    }

    /// Flush and close the write half
    pub async fn shutdown(&mut self) -> TransportResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
