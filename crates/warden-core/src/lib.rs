//! Warden Core - Derivation path model and key derivation for the seed vault
//!
//! This crate provides the purpose-tagged BIP32/BIP44 path model, SLIP-0010
//! ed25519 key derivation, payload signing, and the per-purpose request
//! limits shared by the vault engine.

pub mod derive;
pub mod error;
pub mod limits;
pub mod mnemonic;
pub mod path;
pub mod purpose;
pub mod sign;
pub mod slip10;
pub mod types;

pub use derive::{derive_keypair, derive_partial, derive_public_key, PartialDerivation};
pub use error::{Error, Result};
pub use limits::ImplementationLimits;
pub use mnemonic::MnemonicPhrase;
pub use path::{Bip32Path, Bip44Path, BipLevel, BipPath, BIP32_MAX_DEPTH};
pub use purpose::Purpose;
pub use sign::{sign_payload, SignatureKind};
pub use types::{PublicKey, Signature};

/// ed25519 public key size in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// ed25519 detached signature size in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Expanded secret key size (seed followed by public key)
pub const SECRET_KEY_SIZE: usize = 64;
