//! SLIP-0010 ed25519 key derivation
//!
//! The master node is HMAC-SHA512 of the seed under the fixed key
//! "ed25519 seed"; each child mixes the parent secret and chain code. Only
//! hardened derivation exists for this curve.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::path::{Bip32Path, BipLevel, HARDENED_OFFSET};

type HmacSha512 = Hmac<Sha512>;

const MASTER_SECRET_MAC_KEY: &[u8] = b"ed25519 seed";

/// One node of the derivation tree: secret key material and chain code
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    k: [u8; 32],
    c: [u8; 32],
}

impl KeyMaterial {
    /// Derive the master node from seed bytes
    pub fn master(seed: &[u8]) -> Self {
        let mut mac = hmac_sha512(MASTER_SECRET_MAC_KEY);
        mac.update(seed);
        Self::split(mac.finalize().into_bytes().as_slice())
    }

    /// Derive one hardened child. Non-hardened levels do not exist for
    /// ed25519-SLIP10.
    pub fn derive_child(&self, level: BipLevel) -> Result<Self> {
        if !level.hardened {
            return Err(Error::KeyDoesNotExist(format!(
                "ed25519-SLIP10 does not support non-hardened level {}",
                level.index
            )));
        }
        let mut mac = hmac_sha512(&self.c);
        mac.update(&[0u8]);
        mac.update(&self.k);
        mac.update(&(level.index | HARDENED_OFFSET).to_be_bytes());
        Ok(Self::split(mac.finalize().into_bytes().as_slice()))
    }

    /// Walk every level of `path` from this node
    pub fn derive_path(&self, path: &Bip32Path) -> Result<Self> {
        let mut node = self.clone();
        for level in path.levels() {
            node = node.derive_child(*level)?;
        }
        Ok(node)
    }

    /// The 32-byte secret scalar seed of this node
    pub fn secret(&self) -> &[u8; 32] {
        &self.k
    }

    fn split(h: &[u8]) -> Self {
        let mut k = [0u8; 32];
        let mut c = [0u8; 32];
        k.copy_from_slice(&h[..32]);
        c.copy_from_slice(&h[32..64]);
        Self { k, c }
    }
}

fn hmac_sha512(key: &[u8]) -> HmacSha512 {
    // HMAC accepts keys of any length
    HmacSha512::new_from_slice(key).expect("HMAC key length")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::BipPath;
    use crate::purpose::Purpose;

    // SLIP-0010 test vector 1 for ed25519
    const VECTOR_SEED: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];

    #[test]
    fn test_master_node_vector() {
        let master = KeyMaterial::master(&VECTOR_SEED);
        assert_eq!(
            hex::encode(master.secret()),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
    }

    #[test]
    fn test_hardened_chain_vector() {
        // m/0'/1'/2'/2'/1000000000'
        let master = KeyMaterial::master(&VECTOR_SEED);
        let path = BipPath::parse("bip32:/m/0'/1'/2'/2'/1000000000'")
            .unwrap()
            .to_bip32(Purpose::SignSolanaTransaction)
            .unwrap();
        let node = master.derive_path(&path).unwrap();
        assert_eq!(
            hex::encode(node.secret()),
            "8f94d394a8e8fd6b1bc2f3f49f5c47e385281d5c17e65324b0f62483e37e8793"
        );
    }

    #[test]
    fn test_non_hardened_level_does_not_exist() {
        let master = KeyMaterial::master(&VECTOR_SEED);
        let result = master.derive_child(BipLevel::normal(0));
        assert!(matches!(result, Err(Error::KeyDoesNotExist(_))));
    }

    #[test]
    fn test_derivation_deterministic() {
        let path = BipPath::parse("bip32:/m/44'/501'/5'")
            .unwrap()
            .to_bip32(Purpose::SignSolanaTransaction)
            .unwrap();
        let a = KeyMaterial::master(b"some seed").derive_path(&path).unwrap();
        let b = KeyMaterial::master(b"some seed").derive_path(&path).unwrap();
        assert_eq!(a.secret(), b.secret());
    }
}
