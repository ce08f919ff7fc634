//! Request/response orchestrator
//!
//! Glues the store, policy, session state machine, and derivation engine
//! into the three operations clients invoke: authorize a seed, sign
//! payloads, and fetch public keys.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use warden_core::path::{Bip32Path, BipLevel, BIP44_PURPOSE};
use warden_core::{derive, sign, MnemonicPhrase, PublicKey, Purpose, Signature, SignatureKind};

use crate::authenticator::{AuthChallenge, AuthResponse, InteractiveAuthenticator, RequestKind};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::{
    Account, AccountFlag, AccountId, AuthToken, ClientIdentity, SeedDetails, SeedId,
};
use crate::persist::PersistentStore;
use crate::policy;
use crate::session::{AuthSession, PinCheck, SessionPhase};
use crate::store::SeedStore;

/// One signing sub-request: a payload and the paths to sign it with
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub payload: Vec<u8>,
    pub requested_paths: Vec<String>,
}

/// Signatures for one sub-request, with the normalized paths that produced
/// them
#[derive(Debug, Clone)]
pub struct SigningResponse {
    pub signatures: Vec<Signature>,
    pub resolved_paths: Vec<String>,
}

/// One fetched public key
#[derive(Debug, Clone)]
pub struct PublicKeyResponse {
    pub public_key: PublicKey,
    pub public_key_base58: String,
    pub resolved_path: String,
}

/// The three request kinds clients can submit
#[derive(Debug, Clone)]
pub enum VaultRequest {
    SeedAccess {
        purpose: u32,
        seed_id: Option<SeedId>,
    },
    Signatures {
        token: AuthToken,
        kind: SignatureKind,
        requests: Vec<SigningRequest>,
    },
    PublicKeys {
        token: AuthToken,
        paths: Vec<String>,
    },
}

/// Results for the corresponding [`VaultRequest`]
#[derive(Debug, Clone)]
pub enum VaultResponse {
    AuthToken(AuthToken),
    Signatures(Vec<SigningResponse>),
    PublicKeys(Vec<PublicKeyResponse>),
}

/// The seed vault engine
pub struct SeedVault {
    store: RwLock<SeedStore>,
    authenticator: Arc<dyn InteractiveAuthenticator>,
    config: EngineConfig,
    /// Serializes in-flight authorization sessions; a request arriving while
    /// another session is pending waits here instead of overwriting it
    session_slot: Mutex<()>,
}

impl SeedVault {
    /// Create an engine over the given collaborators
    pub fn new(
        persist: Arc<dyn PersistentStore>,
        authenticator: Arc<dyn InteractiveAuthenticator>,
        config: EngineConfig,
    ) -> Result<Self> {
        let store = SeedStore::new(persist, config.max_seeds)?;
        Ok(Self {
            store: RwLock::new(store),
            authenticator,
            config,
            session_slot: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a seed from prepared details
    pub async fn create_seed(&self, details: SeedDetails) -> Result<SeedId> {
        self.store.write().await.create_seed(details)
    }

    /// Import a seed from a 12- or 24-word phrase
    pub async fn import_seed(
        &self,
        phrase: &str,
        name: Option<String>,
        pin: String,
        unlock_with_biometrics: bool,
    ) -> Result<SeedId> {
        let mnemonic = MnemonicPhrase::parse(phrase)?;
        let details = SeedDetails::new(
            mnemonic.to_seed(""),
            mnemonic.word_indices().to_vec(),
            name,
            pin,
            unlock_with_biometrics,
            true,
        )?;
        self.create_seed(details).await
    }

    /// Replace a seed's details
    pub async fn update_seed(&self, id: SeedId, details: SeedDetails) -> Result<()> {
        self.store.write().await.update_seed(id, details)
    }

    /// Delete a seed with its authorizations and accounts
    pub async fn delete_seed(&self, id: SeedId) -> Result<()> {
        self.store.write().await.delete_seed(id)
    }

    /// Delete every seed
    pub async fn delete_all_seeds(&self) -> Result<()> {
        self.store.write().await.delete_all_seeds()
    }

    /// Revoke the authorization a client holds. Returns whether a grant was
    /// removed; cached accounts are untouched.
    pub async fn deauthorize_seed(&self, client: ClientIdentity, token: AuthToken) -> Result<bool> {
        self.store.write().await.deauthorize(client.uid, token)
    }

    /// Cached accounts visible through a client's authorization
    pub async fn authorized_accounts(
        &self,
        client: ClientIdentity,
        token: AuthToken,
    ) -> Result<Vec<Account>> {
        let store = self.store.read().await;
        let seed = store
            .seed_for_token(client.uid, token)
            .ok_or(EngineError::InvalidAuthToken)?;
        let purpose = resolved_purpose(seed, token);
        Ok(seed
            .accounts
            .iter()
            .filter(|account| account.purpose == purpose)
            .cloned()
            .collect())
    }

    /// Mutate an account's "is user wallet" or "is valid" flag
    pub async fn update_account_flag(
        &self,
        client: ClientIdentity,
        token: AuthToken,
        account_id: AccountId,
        flag: AccountFlag,
        value: bool,
    ) -> Result<()> {
        self.store
            .write()
            .await
            .update_account_flag(client.uid, token, account_id, flag, value)
    }

    /// Rename an account
    pub async fn update_account_name(
        &self,
        client: ClientIdentity,
        token: AuthToken,
        account_id: AccountId,
        name: Option<String>,
    ) -> Result<()> {
        self.store
            .write()
            .await
            .update_account_name(client.uid, token, account_id, name)
    }

    /// Drop every cached account for a seed
    pub async fn remove_all_accounts_for_seed(&self, id: SeedId) -> Result<()> {
        self.store.write().await.remove_all_accounts_for_seed(id)
    }

    /// Dispatch a typed request to the matching operation
    pub async fn handle(
        &self,
        client: ClientIdentity,
        request: VaultRequest,
    ) -> Result<VaultResponse> {
        match request {
            VaultRequest::SeedAccess { purpose, seed_id } => self
                .request_seed_authorization(client, purpose, seed_id)
                .await
                .map(VaultResponse::AuthToken),
            VaultRequest::Signatures {
                token,
                kind,
                requests,
            } => self
                .request_signatures(client, token, kind, requests)
                .await
                .map(VaultResponse::Signatures),
            VaultRequest::PublicKeys { token, paths } => self
                .request_public_keys(client, token, paths)
                .await
                .map(VaultResponse::PublicKeys),
        }
    }

    /// Grant a client access to a seed for a purpose. Always authenticates
    /// interactively; privileged callers are rejected outright.
    pub async fn request_seed_authorization(
        &self,
        client: ClientIdentity,
        purpose: u32,
        seed_id: Option<SeedId>,
    ) -> Result<AuthToken> {
        let purpose = Purpose::from_constant(purpose)?;
        if client.privileged {
            warn!(
                uid = client.uid,
                "Privileged callers must use permissioned accounts, not seed grants"
            );
            return Err(EngineError::NoAvailableSeeds);
        }

        let _session_slot = self.session_slot.lock().await;

        // 1. Select a seed not yet authorized for this (uid, purpose)
        let (seed_id, seed_name, biometrics, pin) = {
            let store = self.store.read().await;
            let seed = store
                .find_unauthorized_seed(purpose, client.uid, seed_id)
                .ok_or_else(|| {
                    warn!(uid = client.uid, "No non-authorized seeds remaining");
                    EngineError::NoAvailableSeeds
                })?;
            (
                seed.id,
                seed.details.name.clone(),
                seed.details.unlock_with_biometrics,
                Zeroizing::new(seed.details.pin.clone()),
            )
        };

        // 2. Interactive authentication is never bypassed for seed grants
        let mut session = AuthSession::new(biometrics);
        session.require_authentication();
        self.authenticate(&mut session, RequestKind::Seed, seed_name, &pin)
            .await?;

        // 3. Mint (or re-fetch) the authorization
        let token = self
            .store
            .write()
            .await
            .authorize_seed_for_uid(seed_id, client.uid, purpose)?;

        // 4. Ensure the known account bank exists for this purpose
        self.prepopulate_known_accounts(seed_id, purpose).await?;

        session.complete();
        info!(seed = seed_id, uid = client.uid, "Seed authorization granted");
        Ok(token)
    }

    /// Sign a batch of payloads with the keys at the requested paths
    pub async fn request_signatures(
        &self,
        client: ClientIdentity,
        token: AuthToken,
        kind: SignatureKind,
        requests: Vec<SigningRequest>,
    ) -> Result<Vec<SigningResponse>> {
        let _session_slot = self.session_slot.lock().await;

        // 1. Resolve the seed through the presented token
        let (purpose, seed_bytes, seed_name, biometrics, pin) = {
            let store = self.store.read().await;
            let seed = store
                .seed_for_token(client.uid, token)
                .ok_or(EngineError::InvalidAuthToken)?;
            (
                resolved_purpose(seed, token),
                Zeroizing::new(*seed.details.seed()),
                seed.details.name.clone(),
                seed.details.unlock_with_biometrics,
                Zeroizing::new(seed.details.pin.clone()),
            )
        };

        // 2. Malformed input is always the first failure reported
        let parsed = requests
            .iter()
            .map(|request| policy::parse_paths(&request.requested_paths))
            .collect::<Result<Vec<_>>>()?;

        // 3. Payload validity, then cardinality ceilings
        if requests.iter().any(|request| request.payload.is_empty()) {
            return Err(EngineError::InvalidPayload);
        }
        let limits = self.config.limits_for(purpose);
        policy::check_signing_request_count(&limits, requests.len())?;
        policy::check_signatures_per_request(
            &limits,
            requests.iter().map(|request| request.requested_paths.len()),
        )?;

        // 4. Expand and canonicalize every path
        let normalized = parsed
            .into_iter()
            .map(|paths| policy::normalize_paths(purpose, paths))
            .collect::<Result<Vec<_>>>()?;

        // 5. Privileged callers staying inside the permissioned subtree skip
        //    interactive authentication
        let bypass = client.privileged
            && normalized
                .iter()
                .all(|paths| policy::all_paths_permissioned(purpose, paths));
        let mut session = AuthSession::new(biometrics);
        if bypass {
            debug!(uid = client.uid, "Permissioned account request; bypassing authentication");
            session.bypass_authentication();
        } else {
            session.require_authentication();
            let request_kind = match kind {
                SignatureKind::Transaction => RequestKind::Transaction,
                SignatureKind::Message => RequestKind::Message,
            };
            self.authenticate(&mut session, request_kind, seed_name, &pin)
                .await?;
        }

        // 6. Derive and sign every (payload, path) pair
        let mut responses = Vec::with_capacity(requests.len());
        for (request, paths) in requests.iter().zip(&normalized) {
            let mut signatures = Vec::with_capacity(paths.len());
            let mut resolved_paths = Vec::with_capacity(paths.len());
            for path in paths {
                let keypair = derive::derive_keypair(purpose, &seed_bytes[..], path)?;
                signatures.push(sign::sign_payload(purpose, kind, &keypair, &request.payload)?);
                resolved_paths.push(path.to_uri());
            }
            responses.push(SigningResponse {
                signatures,
                resolved_paths,
            });
        }

        session.complete();
        info!(requests = responses.len(), "Signing complete");
        Ok(responses)
    }

    /// Fetch public keys for the requested paths, deriving and caching any
    /// that are not yet known
    pub async fn request_public_keys(
        &self,
        client: ClientIdentity,
        token: AuthToken,
        paths: Vec<String>,
    ) -> Result<Vec<PublicKeyResponse>> {
        let _session_slot = self.session_slot.lock().await;

        // 1. Resolve the seed through the presented token
        let (seed_id, purpose, seed_bytes, seed_name, biometrics, pin) = {
            let store = self.store.read().await;
            let seed = store
                .seed_for_token(client.uid, token)
                .ok_or(EngineError::InvalidAuthToken)?;
            (
                seed.id,
                resolved_purpose(seed, token),
                Zeroizing::new(*seed.details.seed()),
                seed.details.name.clone(),
                seed.details.unlock_with_biometrics,
                Zeroizing::new(seed.details.pin.clone()),
            )
        };

        // 2. Parse, then ceiling, then normalize
        let parsed = policy::parse_paths(&paths)?;
        let limits = self.config.limits_for(purpose);
        policy::check_public_key_count(&limits, paths.len())?;
        let normalized = policy::normalize_paths(purpose, parsed)?;

        // 3. A fully cached request returns immediately, without prompting
        let cached: Vec<Option<(PublicKey, String)>> = {
            let store = self.store.read().await;
            let seed = store
                .seed_for_token(client.uid, token)
                .ok_or(EngineError::InvalidAuthToken)?;
            normalized
                .iter()
                .map(|path| {
                    seed.account_for_path(purpose, path)
                        .map(|account| (account.public_key, account.public_key_base58.clone()))
                })
                .collect()
        };
        let mut session = AuthSession::new(biometrics);
        if cached.iter().all(Option::is_some) {
            debug!(uid = client.uid, "All requested public keys cached; bypassing authentication");
            session.bypass_authentication();
        } else {
            let bypass =
                client.privileged && policy::all_paths_permissioned(purpose, &normalized);
            if bypass {
                debug!(uid = client.uid, "Permissioned account request; bypassing authentication");
                session.bypass_authentication();
            } else {
                session.require_authentication();
                self.authenticate(&mut session, RequestKind::PublicKey, seed_name, &pin)
                    .await?;
            }
        }

        // 4. Return cached keys; derive and cache the rest
        let mut responses = Vec::with_capacity(normalized.len());
        for (path, cached_entry) in normalized.into_iter().zip(cached) {
            let (public_key, public_key_base58) = match cached_entry {
                Some(entry) => entry,
                None => {
                    let public =
                        derive::derive_public_key(purpose, &seed_bytes[..], &path, None)?;
                    self.store
                        .write()
                        .await
                        .add_or_get_account(seed_id, purpose, path.clone(), public)?;
                    (public, public.to_base58())
                }
            };
            responses.push(PublicKeyResponse {
                public_key,
                public_key_base58,
                resolved_path: path.to_uri(),
            });
        }

        session.complete();
        info!(keys = responses.len(), "Public key fetch complete");
        Ok(responses)
    }

    /// Drive the authenticator until the session leaves
    /// `AwaitingAuthentication`
    async fn authenticate(
        &self,
        session: &mut AuthSession,
        kind: RequestKind,
        seed_name: Option<String>,
        stored_pin: &str,
    ) -> Result<()> {
        let mut attempts_remaining = None;
        while session.phase() == SessionPhase::AwaitingAuthentication {
            let challenge = AuthChallenge {
                kind,
                seed_name: seed_name.clone(),
                pin_enabled: session.pin_entry_enabled(),
                biometrics_enabled: session.biometrics_enabled(),
                attempts_remaining,
            };
            match self.authenticator.prompt(&challenge).await {
                AuthResponse::Pin(pin) => match session.check_pin(stored_pin, &pin) {
                    PinCheck::Authorized => {}
                    PinCheck::Retry {
                        attempts_remaining: remaining,
                    } => attempts_remaining = Some(remaining),
                    PinCheck::Failed => return Err(EngineError::AuthenticationFailed),
                },
                AuthResponse::BiometricSuccess => session.biometric_success(),
                AuthResponse::BiometricFailure => session.biometric_failure(),
                AuthResponse::Cancel => {
                    session.cancel();
                    return Err(EngineError::Canceled);
                }
            }
        }
        Ok(())
    }

    /// Derive and cache the default account bank for a seed + purpose,
    /// skipping paths already known. The shared purpose/coin-type root is
    /// derived once.
    async fn prepopulate_known_accounts(&self, seed_id: SeedId, purpose: Purpose) -> Result<()> {
        let root_path = Bip32Path::new(vec![
            BipLevel::hardened(BIP44_PURPOSE),
            BipLevel::hardened(purpose.coin_type()),
        ])?
        .normalize(purpose);

        let (seed_bytes, known): (Zeroizing<[u8; 64]>, HashSet<String>) = {
            let store = self.store.read().await;
            let seed = store
                .seed(seed_id)
                .ok_or_else(|| EngineError::InvalidArgument(format!("No seed with id {seed_id}")))?;
            (
                Zeroizing::new(*seed.details.seed()),
                seed.accounts
                    .iter()
                    .filter(|account| account.purpose == purpose)
                    .map(|account| account.path.to_uri())
                    .collect(),
            )
        };

        let root = derive::derive_partial(purpose, &seed_bytes[..], &root_path)?;
        let mut new_accounts = Vec::new();
        for i in 0..self.config.prepopulate_accounts {
            let suffixes = [
                vec![BipLevel::hardened(i)],
                vec![BipLevel::hardened(i), BipLevel::hardened(0)],
            ];
            for suffix in suffixes {
                let full = root_path.extended(&suffix)?.normalize(purpose);
                if known.contains(&full.to_uri()) {
                    debug!(path = %full, "Account already exists; skipping");
                    continue;
                }
                let relative = Bip32Path::new(suffix)?.normalize(purpose);
                match derive::derive_public_key(purpose, &seed_bytes[..], &relative, Some(&root))
                {
                    Ok(public) => new_accounts.push((full, public)),
                    Err(warden_core::Error::KeyDoesNotExist(_)) => {
                        warn!(path = %full, "Key does not exist; skipping");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let count = new_accounts.len();
        let mut store = self.store.write().await;
        for (path, public) in new_accounts {
            store.add_or_get_account(seed_id, purpose, path, public)?;
        }
        debug!(seed = seed_id, count, "Prepopulated known accounts");
        Ok(())
    }
}

/// Purpose of the authorization backing a resolved token
fn resolved_purpose(seed: &crate::model::Seed, token: AuthToken) -> Purpose {
    seed.authorization_for_token(token)
        .map(|auth| auth.purpose)
        .expect("token was resolved against this seed")
}
