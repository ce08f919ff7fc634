//! Vault data model
//!
//! Seeds, their derived accounts, and the authorizations that let clients
//! use them. Secret material is zeroized on drop; everything else is plain
//! serde data so the store can snapshot it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use warden_core::path::Bip32Path;
use warden_core::types::hex_bytes_64;
use warden_core::{mnemonic, PublicKey, Purpose};

use crate::error::{EngineError, Result};

/// Identifies a seed within the store
pub type SeedId = u64;

/// Identifies an account within the store
pub type AccountId = u64;

/// Kernel-style caller identity
pub type ClientUid = u32;

/// Minimum PIN length in characters
pub const PIN_MIN_LENGTH: usize = 4;

/// Maximum PIN length in characters
pub const PIN_MAX_LENGTH: usize = 20;

/// Opaque, unguessable handle for one granted authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthToken(pub u64);

impl AuthToken {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// The requesting client, as observed at the engine boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Caller uid; authorizations are scoped to it
    pub uid: ClientUid,

    /// Whether the caller holds the privileged vault permission
    pub privileged: bool,
}

impl ClientIdentity {
    pub fn new(uid: ClientUid) -> Self {
        Self {
            uid,
            privileged: false,
        }
    }

    pub fn privileged(uid: ClientUid) -> Self {
        Self {
            uid,
            privileged: true,
        }
    }
}

/// Secret details of a stored seed
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SeedDetails {
    /// Derivation seed bytes, never exposed outside the engine
    #[serde(with = "hex_bytes_64")]
    seed: [u8; 64],

    /// Ordered word-list indices of the backing phrase (12 or 24 entries)
    word_indices: Vec<u16>,

    /// Human-readable name
    pub name: Option<String>,

    /// Unlock PIN
    pub pin: String,

    /// Whether biometric unlock is enabled for this seed
    pub unlock_with_biometrics: bool,

    /// Whether the user confirmed backing up the phrase
    pub is_backed_up: bool,
}

impl SeedDetails {
    /// Create seed details, validating the PIN and word-count invariants
    pub fn new(
        seed: [u8; 64],
        word_indices: Vec<u16>,
        name: Option<String>,
        pin: String,
        unlock_with_biometrics: bool,
        is_backed_up: bool,
    ) -> Result<Self> {
        if word_indices.len() != mnemonic::WORD_COUNT_SHORT
            && word_indices.len() != mnemonic::WORD_COUNT_LONG
        {
            return Err(EngineError::InvalidArgument(format!(
                "Seed phrase word count is {}; must be {} or {}",
                word_indices.len(),
                mnemonic::WORD_COUNT_SHORT,
                mnemonic::WORD_COUNT_LONG
            )));
        }
        if pin.len() < PIN_MIN_LENGTH || pin.len() > PIN_MAX_LENGTH {
            return Err(EngineError::InvalidArgument(format!(
                "PIN length is {}; must be between {PIN_MIN_LENGTH} and {PIN_MAX_LENGTH}",
                pin.len()
            )));
        }
        Ok(Self {
            seed,
            word_indices,
            name,
            pin,
            unlock_with_biometrics,
            is_backed_up,
        })
    }

    /// The derivation seed bytes
    pub fn seed(&self) -> &[u8; 64] {
        &self.seed
    }

    /// Ordered word indices of the backing phrase
    pub fn word_indices(&self) -> &[u16] {
        &self.word_indices
    }
}

impl std::fmt::Debug for SeedDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedDetails")
            .field("name", &self.name)
            .field("unlock_with_biometrics", &self.unlock_with_biometrics)
            .field("is_backed_up", &self.is_backed_up)
            .finish_non_exhaustive()
    }
}

/// One granted (seed, client, purpose) authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub uid: ClientUid,
    pub auth_token: AuthToken,
    pub purpose: Purpose,
    pub created_at: DateTime<Utc>,
}

/// A derived account cached for a seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub purpose: Purpose,
    /// Normalized derivation path
    pub path: Bip32Path,
    pub public_key: PublicKey,
    pub public_key_base58: String,
    pub name: Option<String>,
    pub is_user_wallet: bool,
    pub is_valid: bool,
}

/// Mutable boolean account attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountFlag {
    IsUserWallet,
    IsValid,
}

/// A stored seed with its authorizations and cached accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    pub id: SeedId,
    pub details: SeedDetails,
    pub authorizations: Vec<Authorization>,
    pub accounts: Vec<Account>,
}

impl Seed {
    /// The authorization matching a token, if any
    pub fn authorization_for_token(&self, token: AuthToken) -> Option<&Authorization> {
        self.authorizations
            .iter()
            .find(|auth| auth.auth_token == token)
    }

    /// The cached account for a normalized path and purpose, if any
    pub fn account_for_path(&self, purpose: Purpose, path: &Bip32Path) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|account| account.purpose == purpose && &account.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(n: usize) -> Vec<u16> {
        vec![0; n]
    }

    #[test]
    fn test_pin_length_bounds() {
        assert!(SeedDetails::new([0; 64], indices(12), None, "123".into(), false, false).is_err());
        assert!(SeedDetails::new(
            [0; 64],
            indices(12),
            None,
            "1".repeat(21),
            false,
            false
        )
        .is_err());
        assert!(SeedDetails::new([0; 64], indices(12), None, "1234".into(), false, false).is_ok());
    }

    #[test]
    fn test_word_count_bounds() {
        for n in [0, 11, 13, 23, 25] {
            assert!(
                SeedDetails::new([0; 64], indices(n), None, "123456".into(), false, false).is_err()
            );
        }
        for n in [12, 24] {
            assert!(
                SeedDetails::new([0; 64], indices(n), None, "123456".into(), false, false).is_ok()
            );
        }
    }

    #[test]
    fn test_debug_redacts_seed() {
        let details =
            SeedDetails::new([7; 64], indices(12), None, "123456".into(), false, false).unwrap();
        let rendered = format!("{details:?}");
        assert!(!rendered.contains("seed: ["));
        assert!(!rendered.contains("pin"));
    }
}
