//! Authorization session state machine
//!
//! One `AuthSession` exists per in-flight request. It owns the PIN and
//! biometric failure counters and the phase transitions; the engine feeds it
//! authentication outcomes and reads back the phase.

use tracing::{debug, warn};

/// PIN attempts allowed before the session fails fatally
pub const MAX_PIN_ATTEMPTS: u32 = 5;

/// Consecutive biometric failures before PIN entry is offered
pub const PIN_ENTRY_AFTER_BIOMETRIC_FAILURES: u32 = 3;

/// Terminal session outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Success,
    AuthenticationFailed,
    Canceled,
}

/// Session phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    ResolvingRequest,
    AwaitingAuthentication,
    Authorized,
    Completed(SessionOutcome),
}

/// Result of one PIN check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCheck {
    /// PIN matched; the session is now authorized
    Authorized,
    /// PIN mismatched; the caller may retry
    Retry { attempts_remaining: u32 },
    /// PIN mismatched and the attempt ceiling was reached; fatal
    Failed,
}

/// Per-request authorization session
#[derive(Debug)]
pub struct AuthSession {
    phase: SessionPhase,
    pin_failures: u32,
    biometric_failures: u32,
    pin_entry_enabled: bool,
    biometrics_enabled: bool,
}

impl AuthSession {
    /// Start a session for a seed. PIN entry starts enabled only when the
    /// seed does not use biometric unlock.
    pub fn new(unlock_with_biometrics: bool) -> Self {
        Self {
            phase: SessionPhase::ResolvingRequest,
            pin_failures: 0,
            biometric_failures: 0,
            pin_entry_enabled: !unlock_with_biometrics,
            biometrics_enabled: unlock_with_biometrics,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn pin_entry_enabled(&self) -> bool {
        self.pin_entry_enabled
    }

    pub fn biometrics_enabled(&self) -> bool {
        self.biometrics_enabled
    }

    /// Move into `AwaitingAuthentication`. Must only be called while the
    /// request is being resolved; a second concurrent session is a
    /// programming error.
    pub fn require_authentication(&mut self) {
        assert_eq!(
            self.phase,
            SessionPhase::ResolvingRequest,
            "authentication required from phase {:?}",
            self.phase
        );
        self.phase = SessionPhase::AwaitingAuthentication;
    }

    /// Skip interactive authentication entirely (permissioned accounts,
    /// fully cached public keys)
    pub fn bypass_authentication(&mut self) {
        assert_eq!(
            self.phase,
            SessionPhase::ResolvingRequest,
            "bypass from phase {:?}",
            self.phase
        );
        self.authorize();
    }

    /// Compare a presented PIN against the seed's stored PIN
    pub fn check_pin(&mut self, stored: &str, presented: &str) -> PinCheck {
        debug_assert_eq!(self.phase, SessionPhase::AwaitingAuthentication);
        if presented == stored {
            self.authorize();
            return PinCheck::Authorized;
        }
        self.pin_failures += 1;
        if self.pin_failures >= MAX_PIN_ATTEMPTS {
            warn!("Max PIN attempts reached; aborting");
            self.phase = SessionPhase::Completed(SessionOutcome::AuthenticationFailed);
            return PinCheck::Failed;
        }
        let attempts_remaining = MAX_PIN_ATTEMPTS - self.pin_failures;
        warn!(
            attempt = self.pin_failures,
            attempts_remaining, "PIN attempt failed"
        );
        PinCheck::Retry { attempts_remaining }
    }

    /// A biometric match authorizes immediately
    pub fn biometric_success(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::AwaitingAuthentication);
        self.authorize();
    }

    /// A biometric mismatch is never fatal; enough of them enable PIN entry
    pub fn biometric_failure(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::AwaitingAuthentication);
        self.biometric_failures += 1;
        if self.biometric_failures >= PIN_ENTRY_AFTER_BIOMETRIC_FAILURES && !self.pin_entry_enabled
        {
            debug!(
                failures = self.biometric_failures,
                "Enabling PIN entry after biometric failures"
            );
            self.pin_entry_enabled = true;
        }
    }

    /// The user dismissed the prompt
    pub fn cancel(&mut self) {
        self.phase = SessionPhase::Completed(SessionOutcome::Canceled);
    }

    /// Mark the requested operation done
    pub fn complete(&mut self) {
        assert_eq!(
            self.phase,
            SessionPhase::Authorized,
            "completed from phase {:?}",
            self.phase
        );
        self.phase = SessionPhase::Completed(SessionOutcome::Success);
    }

    fn authorize(&mut self) {
        self.phase = SessionPhase::Authorized;
        self.pin_failures = 0;
        self.biometric_failures = 0;
    }
}
