//! Error types for the Warden engine boundary

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced to vault clients. Variant names are stable identifiers;
/// compliance checks match on them.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No seed remains unauthorized for the requesting (identity, purpose)
    #[error("No available seeds")]
    NoAvailableSeeds,

    /// The presented auth token does not resolve for the presenting identity
    #[error("Invalid auth token")]
    InvalidAuthToken,

    /// A signing payload was empty
    #[error("Invalid payload")]
    InvalidPayload,

    /// A derivation path failed to parse, expand, or derive
    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    /// A request exceeded a per-purpose ceiling
    #[error("Implementation limit exceeded: {0}")]
    ImplementationLimitExceeded(String),

    /// The PIN attempt ceiling was reached
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The user dismissed the authentication prompt
    #[error("Authorization canceled")]
    Canceled,

    /// Unknown purpose constant
    #[error("Invalid purpose: {0}")]
    InvalidPurpose(u32),

    /// A malformed argument, distinct from a found-but-current target
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The target row exists but the update was a no-op
    #[error("Not modified")]
    NotModified,

    /// Store invariant violation
    #[error("Store error: {0}")]
    Store(String),

    /// Persistence collaborator failure
    #[error("Persistence error: {0}")]
    Persist(String),
}

impl From<warden_core::Error> for EngineError {
    fn from(e: warden_core::Error) -> Self {
        match e {
            warden_core::Error::InvalidDerivationPath(msg) => EngineError::InvalidDerivationPath(msg),
            // An impossible key means the caller picked an unusable path
            warden_core::Error::KeyDoesNotExist(msg) => EngineError::InvalidDerivationPath(msg),
            warden_core::Error::EmptyPayload => EngineError::InvalidPayload,
            warden_core::Error::UnknownPurpose(c) => EngineError::InvalidPurpose(c),
            warden_core::Error::InvalidMnemonic(msg) => EngineError::InvalidArgument(msg),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Persist(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Persist(e.to_string())
    }
}
