//! The 27-symbol pad alphabet

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ProtocolResult};

/// Ordered alphabet: `A` through `Z`, then space
pub const ALPHABET: &[u8; 27] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ ";

/// Number of symbols in the alphabet
pub const ALPHABET_LEN: u8 = 27;

/// Index of `byte` in the alphabet, or `None` if it is not a symbol
pub const fn index_of(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b' ' => Some(26),
        _ => None,
    }
}

/// Symbol at `index`, reduced modulo the alphabet length
pub const fn symbol_at(index: u8) -> u8 {
    ALPHABET[(index % ALPHABET_LEN) as usize]
}

/// Check that every byte is an alphabet symbol
///
/// Reports the first offending byte and where it was found.
pub fn validate(bytes: &[u8]) -> ProtocolResult<()> {
    match bytes.iter().position(|&b| index_of(b).is_none()) {
        Some(position) => Err(ProtocolError::InvalidSymbol {
            position,
            byte: bytes[position],
        }),
        None => Ok(()),
    }
}

/// Text made only of alphabet symbols
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlphaText(String);

impl AlphaText {
    /// Validate and wrap `text`
    pub fn new(text: impl Into<String>) -> ProtocolResult<Self> {
        let text = text.into();
        validate(text.as_bytes())?;
        Ok(Self(text))
    }

    /// Validate and copy raw bytes received from the wire
    pub fn from_bytes(bytes: &[u8]) -> ProtocolResult<Self> {
        validate(bytes)?;
        Ok(Self(bytes.iter().map(|&b| b as char).collect()))
    }

    /// Build text from alphabet indices; each index is reduced modulo 27
    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Self {
        Self(indices.into_iter().map(|i| symbol_at(i) as char).collect())
    }

    /// Alphabet index of every symbol, in order
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().filter_map(index_of)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Number of symbols (one byte each)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AlphaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AlphaText {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AlphaText {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AlphaText> for String {
    fn from(text: AlphaText) -> Self {
        text.0
    }
}
