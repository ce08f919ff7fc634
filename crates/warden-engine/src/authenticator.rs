//! Interactive authenticator collaborator
//!
//! The engine never captures a PIN or biometric itself; it asks the
//! authenticator to present a prompt and feeds the outcome into the
//! authorization session. Callers drive retries by answering the next
//! prompt.

use async_trait::async_trait;

/// What kind of request the prompt is authorizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Seed,
    Transaction,
    Message,
    PublicKey,
}

/// The prompt presented to the user
#[derive(Debug, Clone)]
pub struct AuthChallenge {
    pub kind: RequestKind,

    /// Display name of the seed being unlocked
    pub seed_name: Option<String>,

    /// Whether PIN entry is currently offered
    pub pin_enabled: bool,

    /// Whether biometric unlock is currently offered
    pub biometrics_enabled: bool,

    /// PIN attempts remaining, present after a failed attempt
    pub attempts_remaining: Option<u32>,
}

/// One authentication outcome reported by the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    /// The user entered this PIN
    Pin(String),

    /// The platform reported a biometric match
    BiometricSuccess,

    /// The platform reported a biometric mismatch
    BiometricFailure,

    /// The user dismissed the prompt
    Cancel,
}

/// Presents PIN/biometric UI and reports the outcome
#[async_trait]
pub trait InteractiveAuthenticator: Send + Sync {
    async fn prompt(&self, challenge: &AuthChallenge) -> AuthResponse;
}
