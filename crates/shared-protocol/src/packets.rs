//! Wire frames exchanged between the client and the daemon
//!
//! ```text
//! client -> daemon   <ROLE><DECLEN>                    control code
//! daemon -> client   ACK                               acknowledgement
//! client -> daemon   <PLAINTEXT>@ENC@<KEY>@END@        request payload
//! daemon -> client   <CIPHERTEXT>@@                    reply payload
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{ProtocolError, ProtocolResult, RoleTag};

/// Acknowledgement token sent by the daemon once a control code is accepted
pub const ACK_TOKEN: &[u8; 3] = b"ACK";

/// Separates the plaintext from the key in a request payload
pub const KEY_DELIMITER: &[u8] = b"@ENC@";

/// Terminates a request payload
pub const END_DELIMITER: &[u8] = b"@END@";

/// Terminates a reply payload
pub const REPLY_MARKER: &[u8] = b"@@";

/// Largest control code frame, role tag included
pub const CONTROL_CODE_MAX: usize = 16;

/// Role tag plus the byte length of the payload that follows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCode {
    pub role: RoleTag,
    pub payload_len: usize,
}

impl ControlCode {
    pub fn new(role: RoleTag, payload_len: usize) -> Self {
        Self { role, payload_len }
    }

    /// Render as `<ROLE><DECLEN>`
    pub fn to_bytes(&self) -> ProtocolResult<Bytes> {
        let code = format!("{}{}", self.role, self.payload_len);
        if code.len() > CONTROL_CODE_MAX {
            return Err(ProtocolError::ControlCodeTooLarge {
                size: code.len(),
                max: CONTROL_CODE_MAX,
            });
        }
        Ok(Bytes::from(code))
    }

    /// Parse a control code frame addressed to `expected`
    ///
    /// The frame must start with the expected tag and continue with one or
    /// more decimal digits and nothing else. Announced lengths above
    /// `max_payload` are refused.
    pub fn parse(frame: &[u8], expected: &RoleTag, max_payload: usize) -> ProtocolResult<Self> {
        if frame.len() > CONTROL_CODE_MAX {
            return Err(ProtocolError::ControlCodeTooLarge {
                size: frame.len(),
                max: CONTROL_CODE_MAX,
            });
        }

        let Some(digits) = frame.strip_prefix(expected.as_bytes()) else {
            let tag_len = frame
                .iter()
                .take_while(|b| b.is_ascii_alphabetic())
                .count();
            return Err(ProtocolError::RoleMismatch {
                expected: expected.to_string(),
                actual: String::from_utf8_lossy(&frame[..tag_len]).into_owned(),
            });
        };

        if digits.is_empty() {
            return Err(ProtocolError::MalformedControlCode(
                "missing payload length".to_string(),
            ));
        }
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(ProtocolError::MalformedControlCode(format!(
                "non-decimal payload length {:?}",
                String::from_utf8_lossy(digits)
            )));
        }

        let payload_len = digits
            .iter()
            .try_fold(0usize, |acc, d| {
                acc.checked_mul(10)?.checked_add(usize::from(d - b'0'))
            })
            .unwrap_or(usize::MAX);

        if payload_len > max_payload {
            return Err(ProtocolError::MessageTooLarge {
                size: payload_len,
                max: max_payload,
            });
        }

        Ok(Self {
            role: expected.clone(),
            payload_len,
        })
    }
}

/// Plaintext and key carried by one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPayload<'a> {
    pub plaintext: &'a [u8],
    /// Key prefix, exactly as long as the plaintext
    pub key: &'a [u8],
}

impl<'a> RequestPayload<'a> {
    /// Build `<PLAINTEXT>@ENC@<KEY PREFIX>@END@`
    ///
    /// Only the first `plaintext.len()` bytes of `key` are sent.
    pub fn compose(plaintext: &[u8], key: &[u8], max_len: usize) -> ProtocolResult<Bytes> {
        if key.len() < plaintext.len() {
            return Err(ProtocolError::KeyTooShort {
                key_len: key.len(),
                plaintext_len: plaintext.len(),
            });
        }

        let total = 2 * plaintext.len() + KEY_DELIMITER.len() + END_DELIMITER.len();
        if total > max_len {
            return Err(ProtocolError::MessageTooLarge {
                size: total,
                max: max_len,
            });
        }

        let mut buf = BytesMut::with_capacity(total);
        buf.put_slice(plaintext);
        buf.put_slice(KEY_DELIMITER);
        buf.put_slice(&key[..plaintext.len()]);
        buf.put_slice(END_DELIMITER);
        Ok(buf.freeze())
    }

    /// Split a received payload at the first key delimiter
    ///
    /// The trailing end delimiter is required and stripped. A key longer
    /// than the plaintext is trimmed to the plaintext's length.
    pub fn parse(payload: &'a [u8]) -> ProtocolResult<Self> {
        let split = find(payload, KEY_DELIMITER).ok_or(ProtocolError::MissingKeyDelimiter)?;
        let plaintext = &payload[..split];
        let rest = &payload[split + KEY_DELIMITER.len()..];

        let key = rest
            .strip_suffix(END_DELIMITER)
            .ok_or(ProtocolError::MissingEndDelimiter)?;

        if key.len() < plaintext.len() {
            return Err(ProtocolError::KeyTooShort {
                key_len: key.len(),
                plaintext_len: plaintext.len(),
            });
        }

        Ok(Self {
            plaintext,
            key: &key[..plaintext.len()],
        })
    }
}

/// Build the reply frame `<CIPHERTEXT>@@`
pub fn reply_frame(ciphertext: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(ciphertext.len() + REPLY_MARKER.len());
    buf.put_slice(ciphertext);
    buf.put_slice(REPLY_MARKER);
    buf.freeze()
}

/// Position of the first occurrence of `needle` in `haystack`
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
