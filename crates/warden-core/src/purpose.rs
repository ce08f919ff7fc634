//! Signing-domain purposes
//!
//! A purpose selects the coin-type constant used when expanding BIP44 paths
//! and the signature algorithm applied to payloads.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What a seed authorization permits a client to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purpose {
    /// Sign transactions and messages for Solana (ed25519, coin type 501)
    SignSolanaTransaction,
}

impl Purpose {
    /// Stable wire constant for this purpose
    pub fn to_constant(self) -> u32 {
        match self {
            Purpose::SignSolanaTransaction => 0,
        }
    }

    /// Resolve a wire constant to a purpose
    pub fn from_constant(c: u32) -> Result<Self> {
        match c {
            0 => Ok(Purpose::SignSolanaTransaction),
            _ => Err(Error::UnknownPurpose(c)),
        }
    }

    /// BIP44 coin type for this purpose
    pub fn coin_type(self) -> u32 {
        match self {
            Purpose::SignSolanaTransaction => 501,
        }
    }
}
