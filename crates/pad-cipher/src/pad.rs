//! Key material and the encode transform

use std::fmt;

use rand::Rng;
use rand::rngs::OsRng;
use shared_protocol::AlphaText;
use shared_protocol::alphabet::{self, index_of, symbol_at};
use tracing::trace;
use zeroize::Zeroizing;

use crate::{CipherError, CipherResult, MODULUS};

/// One-time-pad key: alphabet symbols only, wiped from memory on drop
#[derive(Clone)]
pub struct PadKey {
    symbols: Zeroizing<Vec<u8>>,
}

impl PadKey {
    /// Validate and copy key bytes
    pub fn from_bytes(bytes: &[u8]) -> CipherResult<Self> {
        alphabet::validate(bytes).map_err(CipherError::InvalidKey)?;
        Ok(Self {
            symbols: Zeroizing::new(bytes.to_vec()),
        })
    }

    /// Take ownership of already validated text
    pub fn from_text(text: AlphaText) -> Self {
        Self {
            symbols: Zeroizing::new(text.into_string().into_bytes()),
        }
    }

    /// Generate `len` uniformly random symbols from the OS generator
    pub fn generate(len: usize) -> Self {
        Self::generate_with(&mut OsRng, len)
    }

    /// Generate `len` uniformly random symbols from `rng`
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let symbols = (0..len).map(|_| symbol_at(rng.gen_range(0..MODULUS))).collect();
        Self {
            symbols: Zeroizing::new(symbols),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.symbols.iter().filter_map(|&b| index_of(b))
    }
}

impl fmt::Debug for PadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PadKey")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Encode `plaintext` with the matching prefix of `key`
///
/// Each output symbol is `(index(p) + index(k)) mod 27`. The key must be at
/// least as long as the plaintext; extra key symbols are ignored.
pub fn encode(plaintext: &AlphaText, key: &PadKey) -> CipherResult<AlphaText> {
    if key.len() < plaintext.len() {
        return Err(CipherError::KeyTooShort {
            key_len: key.len(),
            plaintext_len: plaintext.len(),
        });
    }

    let ciphertext = AlphaText::from_indices(
        plaintext
            .indices()
            .zip(key.indices())
            .map(|(p, k)| (p + k) % MODULUS),
    );

    trace!(symbols = ciphertext.len(), "Encoded message");
    Ok(ciphertext)
}
