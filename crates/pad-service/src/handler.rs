//! Daemon side of one session
//!
//! A session is a single connect-to-close exchange: control code,
//! acknowledgement, request payload, reply. Sessions never retry; any
//! violation or I/O failure ends the session and closes the socket.

use net_transport::FramedStream;
use pad_cipher::{PadKey, encode};
use shared_protocol::{
    AlphaText, CONTROL_CODE_MAX, ControlCode, Handshake, HandshakeState, RequestPayload,
    reply_frame,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::{DaemonConfig, ServiceResult};

/// How a session ended, as reported to the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Reply fully sent
    Replied { bytes: usize },
    /// Control code refused, nothing was sent back
    Rejected,
    /// Session aborted after authentication
    Failed,
}

/// Serve a single session on `stream`
///
/// The stream is shut down before returning, whatever the outcome.
pub async fn serve_session<S>(stream: S, config: &DaemonConfig) -> SessionOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = FramedStream::new(stream, config.transport.clone());
    let mut handshake = Handshake::new();

    let outcome = match exchange(&mut framed, &mut handshake, config).await {
        Ok(bytes) => {
            info!(bytes, "Session replied");
            SessionOutcome::Replied { bytes }
        }
        Err(e) if handshake.state() == HandshakeState::Rejected => {
            warn!("Rejected control code: {}", e);
            SessionOutcome::Rejected
        }
        Err(e) => {
            warn!("Session failed in {:?}: {}", handshake.state(), e);
            SessionOutcome::Failed
        }
    };

    if let Err(e) = framed.shutdown().await {
        debug!("Shutdown after session: {}", e);
    }
    if let Err(e) = handshake.advance(HandshakeState::Closed) {
        debug!("{}", e);
    }

    outcome
}

async fn exchange<S>(
    framed: &mut FramedStream<S>,
    handshake: &mut Handshake,
    config: &DaemonConfig,
) -> ServiceResult<usize>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = framed.recv_short(CONTROL_CODE_MAX).await?;
    let code = match ControlCode::parse(
        &frame,
        &config.role_tag,
        framed.config().max_message_size,
    ) {
        Ok(code) => code,
        Err(e) => {
            handshake.advance(HandshakeState::Rejected)?;
            return Err(e.into());
        }
    };
    handshake.advance(HandshakeState::Authenticated)?;
    debug!(payload_len = code.payload_len, "Control code accepted");

    framed.send_ack().await?;
    handshake.advance(HandshakeState::AwaitingPayload)?;

    let payload = framed.recv_exact(code.payload_len).await?;
    handshake.advance(HandshakeState::Processing)?;

    let request = RequestPayload::parse(&payload)?;
    let plaintext = AlphaText::from_bytes(request.plaintext)?;
    let key = PadKey::from_bytes(request.key)?;
    let ciphertext = encode(&plaintext, &key)?;

    let reply = reply_frame(ciphertext.as_bytes());
    framed.send_exact(&reply).await?;
    handshake.advance(HandshakeState::Replied)?;

    Ok(reply.len())
}
