//! Mnemonic phrase import
//!
//! Seeds are imported as ordered 12- or 24-word phrases from the BIP39
//! English word list. Word membership and count are validated; the BIP39
//! checksum is not enforced, so any word combination a user recorded can be
//! imported. The seed is the standard PBKDF2-HMAC-SHA512 stretch of the
//! phrase.

use bip39::Language;
use hmac::Hmac;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Seed length in bytes produced by phrase stretching
pub const SEED_LENGTH: usize = 64;

/// Word count for 128-bit entropy phrases
pub const WORD_COUNT_SHORT: usize = 12;

/// Word count for 256-bit entropy phrases
pub const WORD_COUNT_LONG: usize = 24;

const PBKDF2_ROUNDS: u32 = 2048;
const SALT_PREFIX: &str = "mnemonic";

/// A validated mnemonic phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnemonicPhrase {
    indices: Vec<u16>,
}

impl MnemonicPhrase {
    /// Parse a whitespace-separated phrase
    pub fn parse(phrase: &str) -> Result<Self> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.len() != WORD_COUNT_SHORT && words.len() != WORD_COUNT_LONG {
            return Err(Error::InvalidMnemonic(format!(
                "Phrase has {} words; must be {WORD_COUNT_SHORT} or {WORD_COUNT_LONG}",
                words.len()
            )));
        }
        let list = Language::English.word_list();
        let indices = words
            .iter()
            .map(|word| {
                list.iter()
                    .position(|candidate| candidate == word)
                    .map(|i| i as u16)
                    .ok_or_else(|| Error::InvalidMnemonic(format!("Unknown word '{word}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { indices })
    }

    /// Rebuild a phrase from stored word indices
    pub fn from_indices(indices: &[u16]) -> Result<Self> {
        if indices.len() != WORD_COUNT_SHORT && indices.len() != WORD_COUNT_LONG {
            return Err(Error::InvalidMnemonic(format!(
                "Index list has {} entries; must be {WORD_COUNT_SHORT} or {WORD_COUNT_LONG}",
                indices.len()
            )));
        }
        let list = Language::English.word_list();
        for &index in indices {
            if usize::from(index) >= list.len() {
                return Err(Error::InvalidMnemonic(format!(
                    "Word index {index} out of range"
                )));
            }
        }
        Ok(Self {
            indices: indices.to_vec(),
        })
    }

    /// Ordered word-list indices of this phrase
    pub fn word_indices(&self) -> &[u16] {
        &self.indices
    }

    /// The phrase text
    pub fn phrase(&self) -> String {
        let list = Language::English.word_list();
        self.indices
            .iter()
            .map(|&index| list[usize::from(index)])
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Stretch the phrase into seed bytes
    pub fn to_seed(&self, passphrase: &str) -> [u8; SEED_LENGTH] {
        let phrase = Zeroizing::new(self.phrase());
        let salt = Zeroizing::new(format!("{SALT_PREFIX}{passphrase}"));
        let mut seed = [0u8; SEED_LENGTH];
        pbkdf2::pbkdf2::<Hmac<Sha512>>(phrase.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut seed);
        seed
    }
}
