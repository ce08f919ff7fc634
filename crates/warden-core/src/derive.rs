//! Key derivation engine
//!
//! Walks a normalized BIP32 path from a seed's master node and produces
//! ed25519 keypairs and public keys. The purpose selects the derivation
//! scheme; every supported purpose currently uses ed25519-SLIP10.

use ed25519_dalek::SigningKey;

use crate::error::Result;
use crate::path::Bip32Path;
use crate::purpose::Purpose;
use crate::slip10::KeyMaterial;
use crate::types::PublicKey;

/// Opaque intermediate node for deriving groups of keys that share a path
/// prefix without re-walking the shared levels.
pub struct PartialDerivation {
    node: KeyMaterial,
}

/// Derive the keypair for a seed at a normalized path. Fails with
/// `KeyDoesNotExist` only for paths that can never exist (a non-hardened
/// level on this curve).
pub fn derive_keypair(purpose: Purpose, seed: &[u8], path: &Bip32Path) -> Result<SigningKey> {
    match purpose {
        Purpose::SignSolanaTransaction => {
            let node = KeyMaterial::master(seed).derive_path(path)?;
            Ok(SigningKey::from_bytes(node.secret()))
        }
    }
}

/// Derive the public key for a seed at a normalized path. When `root` is
/// provided, `path` is interpreted relative to it.
pub fn derive_public_key(
    purpose: Purpose,
    seed: &[u8],
    path: &Bip32Path,
    root: Option<&PartialDerivation>,
) -> Result<PublicKey> {
    match purpose {
        Purpose::SignSolanaTransaction => {
            let node = match root {
                Some(partial) => partial.node.derive_path(path)?,
                None => KeyMaterial::master(seed).derive_path(path)?,
            };
            let key = SigningKey::from_bytes(node.secret());
            Ok(PublicKey::new(key.verifying_key().to_bytes()))
        }
    }
}

/// Derive the shared-prefix node for a batch of related paths
pub fn derive_partial(purpose: Purpose, seed: &[u8], prefix: &Bip32Path) -> Result<PartialDerivation> {
    match purpose {
        Purpose::SignSolanaTransaction => {
            let node = KeyMaterial::master(seed).derive_path(prefix)?;
            Ok(PartialDerivation { node })
        }
    }
}
