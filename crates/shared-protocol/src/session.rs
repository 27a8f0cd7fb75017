//! Session identity, peer roles and the daemon handshake state machine

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ProtocolError, ProtocolResult};

/// Unique identifier for one connect-to-close exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Role tag a client presents in its control code
///
/// Tags are 1 to 8 uppercase ASCII letters so the decimal length that
/// follows them in a control code is never ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleTag(Cow<'static, str>);

impl RoleTag {
    /// Tag used by the encryption client and daemon
    pub const ENCRYPT: RoleTag = RoleTag(Cow::Borrowed("ENC"));

    /// Longest tag accepted
    pub const MAX_LEN: usize = 8;

    pub fn new(tag: impl Into<String>) -> ProtocolResult<Self> {
        let tag = tag.into();
        let well_formed = !tag.is_empty()
            && tag.len() <= Self::MAX_LEN
            && tag.bytes().all(|b| b.is_ascii_uppercase());

        if !well_formed {
            return Err(ProtocolError::InvalidRoleTag(tag));
        }
        Ok(Self(Cow::Owned(tag)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for RoleTag {
    fn default() -> Self {
        Self::ENCRYPT
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoleTag {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleTag> for String {
    fn from(tag: RoleTag) -> Self {
        tag.0.into_owned()
    }
}

/// Daemon-side handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeState {
    /// Waiting for the control code
    AwaitingCode,
    /// Role tag matched and length parsed
    Authenticated,
    /// Acknowledgement sent, waiting for the payload
    AwaitingPayload,
    /// Payload received, transform running
    Processing,
    /// Reply fully sent
    Replied,
    /// Role tag or control code refused
    Rejected,
    /// Socket shut down
    Closed,
}

impl HandshakeState {
    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: HandshakeState) -> bool {
        use HandshakeState::*;

        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (AwaitingCode, Authenticated | Rejected) => true,
            (Authenticated, AwaitingPayload) => true,
            (AwaitingPayload, Processing) => true,
            (Processing, Replied) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakeState::Closed)
    }
}

/// Tracks one session's progress through [`HandshakeState`]
#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::AwaitingCode,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Move to `next`, refusing transitions the protocol does not allow
    pub fn advance(&mut self, next: HandshakeState) -> ProtocolResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ProtocolError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tag_validation() {
        assert_eq!(RoleTag::new("ENC").unwrap(), RoleTag::ENCRYPT);
        assert!(RoleTag::new("DEC").is_ok());
        assert!(RoleTag::new("").is_err());
        assert!(RoleTag::new("enc").is_err());
        assert!(RoleTag::new("ENC1").is_err());
        assert!(RoleTag::new("TOOLONGTAG").is_err());
    }

    #[test]
    fn test_role_tag_serde() {
        let tag: RoleTag = serde_json::from_str("\"DEC\"").unwrap();
        assert_eq!(tag.as_str(), "DEC");
        assert_eq!(serde_json::to_string(&RoleTag::ENCRYPT).unwrap(), "\"ENC\"");
        assert!(serde_json::from_str::<RoleTag>("\"E2\"").is_err());
    }

    #[test]
    fn test_handshake_happy_path() {
        let mut handshake = Handshake::new();
        for next in [
            HandshakeState::Authenticated,
            HandshakeState::AwaitingPayload,
            HandshakeState::Processing,
            HandshakeState::Replied,
            HandshakeState::Closed,
        ] {
            handshake.advance(next).unwrap();
        }
        assert!(handshake.state().is_terminal());
    }

    #[test]
    fn test_handshake_rejection_path() {
        let mut handshake = Handshake::new();
        handshake.advance(HandshakeState::Rejected).unwrap();
        assert!(handshake.advance(HandshakeState::AwaitingPayload).is_err());
        handshake.advance(HandshakeState::Closed).unwrap();
    }

    #[test]
    fn test_handshake_cannot_skip_ack() {
        let mut handshake = Handshake::new();
        handshake.advance(HandshakeState::Authenticated).unwrap();
        let err = handshake.advance(HandshakeState::Processing).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidStateTransition {
                from: HandshakeState::Authenticated,
                to: HandshakeState::Processing,
            }
        ));
    }

    #[test]
    fn test_closed_is_final() {
        let mut handshake = Handshake::new();
        handshake.advance(HandshakeState::Closed).unwrap();
        assert!(handshake.advance(HandshakeState::Closed).is_err());
    }
}
