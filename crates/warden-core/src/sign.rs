//! Payload signing
//!
//! The purpose selects the signature algorithm. Transactions and messages
//! share the same key; for the Solana purpose both are plain ed25519
//! detached signatures over the raw payload.

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::purpose::Purpose;
use crate::types::Signature;

/// Whether a payload is a transaction or an off-chain message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureKind {
    Transaction,
    Message,
}

/// Sign a non-empty payload with a derived key
pub fn sign_payload(
    purpose: Purpose,
    kind: SignatureKind,
    key: &SigningKey,
    payload: &[u8],
) -> Result<Signature> {
    if payload.is_empty() {
        return Err(Error::EmptyPayload);
    }
    match (purpose, kind) {
        (Purpose::SignSolanaTransaction, SignatureKind::Transaction)
        | (Purpose::SignSolanaTransaction, SignatureKind::Message) => {
            Ok(Signature::new(key.sign(payload).to_bytes()))
        }
    }
}
