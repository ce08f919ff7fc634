//! Error types for the warden-core library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("Key does not exist for derivation path: {0}")]
    KeyDoesNotExist(String),

    #[error("Invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("Unknown purpose constant: {0}")]
    UnknownPurpose(u32),

    #[error("Invalid payload: payload must not be empty")]
    EmptyPayload,
}
