//! Warden Engine - Seed custody and authorization for wallet clients
//!
//! This crate provides:
//! - The seed/account/authorization store with snapshot persistence
//! - The per-request authorization session state machine
//! - Request quota and permissioned-account policy
//! - The orchestrator exposing the three client operations: authorize a
//!   seed, sign payloads, and fetch public keys

pub mod authenticator;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod persist;
pub mod policy;
pub mod session;
pub mod store;

pub use authenticator::{AuthChallenge, AuthResponse, InteractiveAuthenticator, RequestKind};
pub use config::EngineConfig;
pub use engine::{
    PublicKeyResponse, SeedVault, SigningRequest, SigningResponse, VaultRequest, VaultResponse,
};
pub use error::{EngineError, Result};
pub use model::{
    Account, AccountFlag, AccountId, AuthToken, Authorization, ClientIdentity, ClientUid, Seed,
    SeedDetails, SeedId,
};
pub use persist::{JsonFileStore, NullStore, PersistentStore, StoreSnapshot};
pub use session::{AuthSession, PinCheck, SessionOutcome, SessionPhase, MAX_PIN_ATTEMPTS};
pub use store::SeedStore;
