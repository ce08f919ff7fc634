//! Per-purpose request ceilings
//!
//! Immutable configuration consulted by the request policy before any
//! derivation work is engaged.

use serde::{Deserialize, Serialize};

use crate::purpose::Purpose;

/// Request ceilings for one purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationLimits {
    /// Maximum signing sub-requests per call
    pub max_signing_requests: usize,

    /// Maximum signatures requested within any single sub-request
    pub max_requested_signatures: usize,

    /// Maximum public keys per call
    pub max_requested_public_keys: usize,
}

impl ImplementationLimits {
    /// The default ceilings for a purpose
    pub const fn for_purpose(purpose: Purpose) -> Self {
        match purpose {
            Purpose::SignSolanaTransaction => Self {
                max_signing_requests: 3,
                max_requested_signatures: 3,
                max_requested_public_keys: 10,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solana_limits() {
        let limits = ImplementationLimits::for_purpose(Purpose::SignSolanaTransaction);
        assert_eq!(limits.max_signing_requests, 3);
        assert_eq!(limits.max_requested_signatures, 3);
        assert_eq!(limits.max_requested_public_keys, 10);
    }
}
