//! Quota & validation policy
//!
//! Pure checks consulted before any derivation work. Ordering matters for
//! compliance: malformed paths are reported first, then payload validity,
//! then cardinality ceilings, then path expansion/normalization.

use warden_core::path::{Bip32Path, BipLevel, BipPath};
use warden_core::{ImplementationLimits, Purpose};

use crate::error::{EngineError, Result};

/// BIP44 account index reserved for permissioned accounts
pub const PERMISSIONED_BIP44_ACCOUNT: u32 = 10000;

/// BIP44 change value of the permissioned subtree
pub const PERMISSIONED_BIP44_CHANGE: u32 = 0;

/// Parse a batch of derivation path URIs. An empty batch is invalid; a
/// malformed entry is the first failure a request can surface.
pub fn parse_paths(uris: &[String]) -> Result<Vec<BipPath>> {
    if uris.is_empty() {
        return Err(EngineError::InvalidArgument(
            "At least one derivation path must be provided".to_string(),
        ));
    }
    uris.iter()
        .map(|uri| BipPath::parse(uri).map_err(EngineError::from))
        .collect()
}

/// Expand and canonicalize parsed paths for a purpose
pub fn normalize_paths(purpose: Purpose, paths: Vec<BipPath>) -> Result<Vec<Bip32Path>> {
    paths
        .into_iter()
        .map(|path| Ok(path.to_bip32(purpose)?.normalize(purpose)))
        .collect()
}

/// Reject signing batches with more sub-requests than the purpose allows
pub fn check_signing_request_count(limits: &ImplementationLimits, count: usize) -> Result<()> {
    if count > limits.max_signing_requests {
        return Err(EngineError::ImplementationLimitExceeded(format!(
            "{count} signing requests exceed the maximum of {}",
            limits.max_signing_requests
        )));
    }
    Ok(())
}

/// Reject any single sub-request asking for too many signatures
pub fn check_signatures_per_request(
    limits: &ImplementationLimits,
    requested: impl Iterator<Item = usize>,
) -> Result<()> {
    for count in requested {
        if count > limits.max_requested_signatures {
            return Err(EngineError::ImplementationLimitExceeded(format!(
                "{count} requested signatures exceed the maximum of {}",
                limits.max_requested_signatures
            )));
        }
    }
    Ok(())
}

/// Reject public-key batches above the purpose ceiling
pub fn check_public_key_count(limits: &ImplementationLimits, count: usize) -> Result<()> {
    if count > limits.max_requested_public_keys {
        return Err(EngineError::ImplementationLimitExceeded(format!(
            "{count} requested public keys exceed the maximum of {}",
            limits.max_requested_public_keys
        )));
    }
    Ok(())
}

/// The normalized root of the derivation subtree privileged callers may use
/// without interactive authentication
pub fn permissioned_account_ancestor(purpose: Purpose) -> Bip32Path {
    let path = warden_core::Bip44Path::new(
        BipLevel::hardened(PERMISSIONED_BIP44_ACCOUNT),
        Some(BipLevel::normal(PERMISSIONED_BIP44_CHANGE)),
        None,
    )
    .expect("account level is hardened");
    path.to_bip32(purpose)
        .expect("permissioned ancestor is within depth bounds")
        .normalize(purpose)
}

/// Whether every requested path descends from the permissioned subtree
pub fn all_paths_permissioned(purpose: Purpose, paths: &[Bip32Path]) -> bool {
    let ancestor = permissioned_account_ancestor(purpose);
    paths.iter().all(|path| ancestor.is_ancestor_of(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::path;

    const PURPOSE: Purpose = Purpose::SignSolanaTransaction;

    fn limits() -> ImplementationLimits {
        ImplementationLimits::for_purpose(PURPOSE)
    }

    #[test]
    fn test_empty_path_set_is_invalid_argument() {
        assert!(matches!(
            parse_paths(&[]),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_malformed_path_reported() {
        let uris = vec!["bip32:/m/0'".to_string(), "bip32:/m/x".to_string()];
        assert!(matches!(
            parse_paths(&uris),
            Err(EngineError::InvalidDerivationPath(_))
        ));
    }

    #[test]
    fn test_signing_request_count_limit() {
        assert!(check_signing_request_count(&limits(), 3).is_ok());
        assert!(matches!(
            check_signing_request_count(&limits(), 4),
            Err(EngineError::ImplementationLimitExceeded(_))
        ));
    }

    #[test]
    fn test_signatures_per_request_limit() {
        assert!(check_signatures_per_request(&limits(), [3, 1].into_iter()).is_ok());
        assert!(check_signatures_per_request(&limits(), [1, 4].into_iter()).is_err());
    }

    #[test]
    fn test_public_key_count_limit() {
        assert!(check_public_key_count(&limits(), 10).is_ok());
        assert!(check_public_key_count(&limits(), 11).is_err());
    }

    #[test]
    fn test_permissioned_ancestor_shape() {
        let ancestor = permissioned_account_ancestor(PURPOSE);
        let expected = path::resolve(PURPOSE, "bip32:/m/44'/501'/10000'/0'").unwrap();
        assert_eq!(ancestor, expected);
    }

    #[test]
    fn test_all_paths_permissioned() {
        let inside = path::resolve(PURPOSE, "bip32:/m/44'/501'/10000'/0'/3'").unwrap();
        let outside = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
        assert!(all_paths_permissioned(PURPOSE, &[inside.clone()]));
        assert!(!all_paths_permissioned(PURPOSE, &[inside, outside]));
    }
}
