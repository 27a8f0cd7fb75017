//! Encryption client

use net_transport::{AckStatus, FramedStream};
use pad_cipher::PadKey;
use shared_protocol::{AlphaText, ControlCode, REPLY_MARKER, RequestPayload};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use crate::{ClientConfig, ServiceError, ServiceResult};

/// Client-side progress through one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    InputValidated,
    Connected,
    CodeSent,
    AckWait,
    PayloadSent,
    ReplyWait,
    Done,
    Aborted,
}

/// Sends one plaintext and key to the daemon per [`EncryptClient::encrypt`]
/// call and returns the ciphertext
pub struct EncryptClient {
    config: ClientConfig,
    state: ClientState,
}

impl EncryptClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: ClientState::Idle,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Encrypt `plaintext` with the matching prefix of `key`
    ///
    /// A key shorter than the plaintext fails before any connection is
    /// attempted.
    pub async fn encrypt(
        &mut self,
        plaintext: &AlphaText,
        key: &PadKey,
    ) -> ServiceResult<AlphaText> {
        self.state = ClientState::Idle;

        match self.exchange(plaintext, key).await {
            Ok(ciphertext) => {
                self.state = ClientState::Done;
                Ok(ciphertext)
            }
            Err(e) => {
                if self.state != ClientState::Idle {
                    self.state = ClientState::Aborted;
                }
                Err(e)
            }
        }
    }

    async fn exchange(&mut self, plaintext: &AlphaText, key: &PadKey) -> ServiceResult<AlphaText> {
        if key.len() < plaintext.len() {
            return Err(ServiceError::KeyTooShort {
                key_len: key.len(),
                plaintext_len: plaintext.len(),
            });
        }

        let payload = RequestPayload::compose(
            plaintext.as_bytes(),
            key.as_bytes(),
            self.config.transport.max_message_size,
        )?;
        let code = ControlCode::new(self.config.role_tag.clone(), payload.len()).to_bytes()?;
        self.enter(ClientState::InputValidated);

        let addr = self.config.server_addr.clone();
        let stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|source| ServiceError::Connection {
                addr: addr.clone(),
                source,
            })?;
        self.enter(ClientState::Connected);
        debug!("Connected to {}", addr);

        let mut framed = FramedStream::new(stream, self.config.transport.clone());

        framed.send_exact(&code).await?;
        self.enter(ClientState::CodeSent);
        self.enter(ClientState::AckWait);
        if framed.get_ack().await? == AckStatus::NotAcknowledged {
            warn!(
                "No acknowledgement from {} within {:?}",
                addr,
                self.config.transport.ack_budget()
            );
            return Err(ServiceError::AckTimeout { addr });
        }

        framed.send_exact(&payload).await?;
        self.enter(ClientState::PayloadSent);
        self.enter(ClientState::ReplyWait);
        let reply = framed
            .recv_until(REPLY_MARKER, plaintext.len() + REPLY_MARKER.len())
            .await?;
        let ciphertext = AlphaText::from_bytes(&reply)?;

        if let Err(e) = framed.shutdown().await {
            debug!("Shutdown after reply: {}", e);
        }

        info!(symbols = ciphertext.len(), "Received ciphertext");
        Ok(ciphertext)
    }

    fn enter(&mut self, state: ClientState) {
        trace!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }
}
