//! Seed & account store
//!
//! In-memory map of seeds with their authorizations and cached accounts,
//! snapshotted to the persistence collaborator after every mutation. All
//! access is serialized by the engine; methods take `&mut self`.

use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use warden_core::path::Bip32Path;
use warden_core::{PublicKey, Purpose};

use crate::error::{EngineError, Result};
use crate::model::{
    Account, AccountFlag, AccountId, AuthToken, Authorization, ClientUid, Seed, SeedDetails, SeedId,
};
use crate::persist::{PersistentStore, StoreSnapshot};

const FIRST_SEED_ID: SeedId = 1000;
const FIRST_ACCOUNT_ID: AccountId = 7000;

/// Storage for seeds, authorizations, and cached accounts
pub struct SeedStore {
    seeds: BTreeMap<SeedId, Seed>,
    next_seed_id: SeedId,
    next_account_id: AccountId,
    max_seeds: usize,
    persist: Arc<dyn PersistentStore>,
}

impl SeedStore {
    /// Open the store, restoring any saved snapshot
    pub fn new(persist: Arc<dyn PersistentStore>, max_seeds: usize) -> Result<Self> {
        let snapshot = persist.load()?.unwrap_or_default();
        let seeds: BTreeMap<SeedId, Seed> = snapshot
            .seeds
            .into_iter()
            .map(|seed| (seed.id, seed))
            .collect();
        let next_seed_id = snapshot.next_seed_id.max(FIRST_SEED_ID);
        let next_account_id = snapshot.next_account_id.max(FIRST_ACCOUNT_ID);
        debug!(seeds = seeds.len(), "Seed store opened");
        Ok(Self {
            seeds,
            next_seed_id,
            next_account_id,
            max_seeds,
            persist,
        })
    }

    /// Whether the store has reached its seed capacity
    pub fn is_full(&self) -> bool {
        self.seeds.len() >= self.max_seeds
    }

    /// Look up a seed by id
    pub fn seed(&self, id: SeedId) -> Option<&Seed> {
        self.seeds.get(&id)
    }

    /// All seeds, in ascending id order
    pub fn seeds(&self) -> impl Iterator<Item = &Seed> {
        self.seeds.values()
    }

    /// Create a new seed
    pub fn create_seed(&mut self, details: SeedDetails) -> Result<SeedId> {
        if self.is_full() {
            return Err(EngineError::Store(format!(
                "Seed store is full ({} seeds); cannot add another",
                self.seeds.len()
            )));
        }
        let id = self.next_seed_id;
        self.next_seed_id += 1;
        self.seeds.insert(
            id,
            Seed {
                id,
                details,
                authorizations: Vec::new(),
                accounts: Vec::new(),
            },
        );
        self.save()?;
        info!(seed = id, "Created seed");
        Ok(id)
    }

    /// Replace the details of an existing seed
    pub fn update_seed(&mut self, id: SeedId, details: SeedDetails) -> Result<()> {
        let seed = self
            .seeds
            .get_mut(&id)
            .ok_or_else(|| EngineError::InvalidArgument(format!("No seed with id {id}")))?;
        seed.details = details;
        self.save()?;
        info!(seed = id, "Updated seed");
        Ok(())
    }

    /// Delete a seed with its authorizations and accounts
    pub fn delete_seed(&mut self, id: SeedId) -> Result<()> {
        if self.seeds.remove(&id).is_none() {
            return Err(EngineError::InvalidArgument(format!("No seed with id {id}")));
        }
        self.save()?;
        info!(seed = id, "Deleted seed");
        Ok(())
    }

    /// Delete every seed
    pub fn delete_all_seeds(&mut self) -> Result<()> {
        self.seeds.clear();
        self.save()?;
        info!("Deleted all seeds");
        Ok(())
    }

    /// First seed (ascending id order) matching the optional id filter and
    /// not yet authorized for (uid, purpose)
    pub fn find_unauthorized_seed(
        &self,
        purpose: Purpose,
        uid: ClientUid,
        id_filter: Option<SeedId>,
    ) -> Option<&Seed> {
        self.seeds.values().find(|seed| {
            id_filter.map_or(true, |id| seed.id == id)
                && !seed
                    .authorizations
                    .iter()
                    .any(|auth| auth.uid == uid && auth.purpose == purpose)
        })
    }

    /// Grant (or re-fetch) an authorization for (seed, uid, purpose).
    /// Idempotent: an existing grant returns its token unchanged.
    pub fn authorize_seed_for_uid(
        &mut self,
        id: SeedId,
        uid: ClientUid,
        purpose: Purpose,
    ) -> Result<AuthToken> {
        let token = self.mint_auth_token();
        let seed = self
            .seeds
            .get_mut(&id)
            .ok_or_else(|| EngineError::InvalidArgument(format!("No seed with id {id}")))?;
        if let Some(existing) = seed
            .authorizations
            .iter()
            .find(|auth| auth.uid == uid && auth.purpose == purpose)
        {
            debug!(seed = id, uid, "Authorization already exists; reusing token");
            return Ok(existing.auth_token);
        }
        seed.authorizations.push(Authorization {
            uid,
            auth_token: token,
            purpose,
            created_at: chrono::Utc::now(),
        });
        self.save()?;
        info!(seed = id, uid, "Authorized seed");
        Ok(token)
    }

    /// Remove the authorization a client holds under `token`. Returns whether
    /// a row was removed. Does not cascade to accounts.
    pub fn deauthorize(&mut self, uid: ClientUid, token: AuthToken) -> Result<bool> {
        let mut removed = false;
        for seed in self.seeds.values_mut() {
            let before = seed.authorizations.len();
            seed.authorizations
                .retain(|auth| !(auth.uid == uid && auth.auth_token == token));
            if seed.authorizations.len() != before {
                removed = true;
                info!(seed = seed.id, uid, "Deauthorized seed");
                break;
            }
        }
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Resolve a presented token, scoped to the presenting identity
    pub fn seed_for_token(&self, uid: ClientUid, token: AuthToken) -> Option<&Seed> {
        self.seeds.values().find(|seed| {
            seed.authorizations
                .iter()
                .any(|auth| auth.uid == uid && auth.auth_token == token)
        })
    }

    /// Upsert an account keyed by (seed, purpose, path). Returns the existing
    /// account id when the path is already cached.
    pub fn add_or_get_account(
        &mut self,
        id: SeedId,
        purpose: Purpose,
        path: Bip32Path,
        public_key: PublicKey,
    ) -> Result<AccountId> {
        let account_id = self.next_account_id;
        let seed = self
            .seeds
            .get_mut(&id)
            .ok_or_else(|| EngineError::InvalidArgument(format!("No seed with id {id}")))?;
        if let Some(existing) = seed
            .accounts
            .iter()
            .find(|account| account.purpose == purpose && account.path == path)
        {
            return Ok(existing.id);
        }
        self.next_account_id += 1;
        debug!(seed = id, account = account_id, path = %path, "Caching account");
        seed.accounts.push(Account {
            id: account_id,
            purpose,
            path,
            public_key_base58: public_key.to_base58(),
            public_key,
            name: None,
            is_user_wallet: false,
            is_valid: false,
        });
        self.save()?;
        Ok(account_id)
    }

    /// Mutate one of the boolean account attributes. An unknown token is
    /// `InvalidArgument`; an unknown account id or an already-current value
    /// is `NotModified` (distinct outcomes).
    pub fn update_account_flag(
        &mut self,
        uid: ClientUid,
        token: AuthToken,
        account_id: AccountId,
        flag: AccountFlag,
        value: bool,
    ) -> Result<()> {
        let seed_id = self
            .seed_for_token(uid, token)
            .map(|seed| seed.id)
            .ok_or_else(|| EngineError::InvalidArgument("Unknown auth token".to_string()))?;
        let seed = self.seeds.get_mut(&seed_id).expect("seed resolved by token");
        let Some(account) = seed
            .accounts
            .iter_mut()
            .find(|account| account.id == account_id)
        else {
            return Err(EngineError::NotModified);
        };
        let field = match flag {
            AccountFlag::IsUserWallet => &mut account.is_user_wallet,
            AccountFlag::IsValid => &mut account.is_valid,
        };
        if *field == value {
            return Err(EngineError::NotModified);
        }
        *field = value;
        self.save()?;
        debug!(seed = seed_id, account = account_id, ?flag, value, "Updated account flag");
        Ok(())
    }

    /// Rename an account, with the same outcome classification as flag
    /// updates
    pub fn update_account_name(
        &mut self,
        uid: ClientUid,
        token: AuthToken,
        account_id: AccountId,
        name: Option<String>,
    ) -> Result<()> {
        let seed_id = self
            .seed_for_token(uid, token)
            .map(|seed| seed.id)
            .ok_or_else(|| EngineError::InvalidArgument("Unknown auth token".to_string()))?;
        let seed = self.seeds.get_mut(&seed_id).expect("seed resolved by token");
        let Some(account) = seed
            .accounts
            .iter_mut()
            .find(|account| account.id == account_id)
        else {
            return Err(EngineError::NotModified);
        };
        if account.name == name {
            return Err(EngineError::NotModified);
        }
        account.name = name;
        self.save()?;
        Ok(())
    }

    /// Drop every cached account for a seed
    pub fn remove_all_accounts_for_seed(&mut self, id: SeedId) -> Result<()> {
        let seed = self
            .seeds
            .get_mut(&id)
            .ok_or_else(|| EngineError::InvalidArgument(format!("No seed with id {id}")))?;
        seed.accounts.clear();
        self.save()?;
        info!(seed = id, "Removed all cached accounts");
        Ok(())
    }

    fn mint_auth_token(&self) -> AuthToken {
        let mut rng = rand::thread_rng();
        loop {
            let candidate: u64 = rng.gen();
            if candidate == 0 {
                continue;
            }
            let taken = self.seeds.values().any(|seed| {
                seed.authorizations
                    .iter()
                    .any(|auth| auth.auth_token.0 == candidate)
            });
            if !taken {
                return AuthToken(candidate);
            }
        }
    }

    fn save(&self) -> Result<()> {
        let snapshot = StoreSnapshot {
            seeds: self.seeds.values().cloned().collect(),
            next_seed_id: self.next_seed_id,
            next_account_id: self.next_account_id,
        };
        self.persist.save(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::NullStore;
    use warden_core::path;

    const PURPOSE: Purpose = Purpose::SignSolanaTransaction;

    fn details(name: &str) -> SeedDetails {
        SeedDetails::new(
            [3u8; 64],
            vec![0; 12],
            Some(name.to_string()),
            "123456".to_string(),
            false,
            false,
        )
        .unwrap()
    }

    fn store() -> SeedStore {
        SeedStore::new(Arc::new(NullStore), 4).unwrap()
    }

    #[test]
    fn test_create_seed_assigns_sequential_ids() {
        let mut store = store();
        let a = store.create_seed(details("a")).unwrap();
        let b = store.create_seed(details("b")).unwrap();
        assert_eq!(a, 1000);
        assert_eq!(b, 1001);
    }

    #[test]
    fn test_store_capacity() {
        let mut store = store();
        for i in 0..4 {
            store.create_seed(details(&format!("s{i}"))).unwrap();
        }
        assert!(store.is_full());
        assert!(store.create_seed(details("overflow")).is_err());
    }

    #[test]
    fn test_authorize_is_idempotent() {
        let mut store = store();
        let id = store.create_seed(details("a")).unwrap();
        let token1 = store.authorize_seed_for_uid(id, 10, PURPOSE).unwrap();
        let token2 = store.authorize_seed_for_uid(id, 10, PURPOSE).unwrap();
        assert_eq!(token1, token2);
        assert_eq!(store.seed(id).unwrap().authorizations.len(), 1);
    }

    #[test]
    fn test_token_scoped_to_identity() {
        let mut store = store();
        let id = store.create_seed(details("a")).unwrap();
        let token = store.authorize_seed_for_uid(id, 10, PURPOSE).unwrap();
        assert!(store.seed_for_token(10, token).is_some());
        assert!(store.seed_for_token(11, token).is_none());
    }

    #[test]
    fn test_deauthorize_keeps_accounts() {
        let mut store = store();
        let id = store.create_seed(details("a")).unwrap();
        let token = store.authorize_seed_for_uid(id, 10, PURPOSE).unwrap();
        let other = store.authorize_seed_for_uid(id, 11, PURPOSE).unwrap();

        let p = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
        store
            .add_or_get_account(id, PURPOSE, p, PublicKey::new([1; 32]))
            .unwrap();

        assert!(store.deauthorize(10, token).unwrap());
        assert!(store.seed_for_token(10, token).is_none());
        // second removal is a no-op
        assert!(!store.deauthorize(10, token).unwrap());
        // accounts survive, visible through the other client's grant
        assert_eq!(store.seed_for_token(11, other).unwrap().accounts.len(), 1);
    }

    #[test]
    fn test_find_unauthorized_seed() {
        let mut store = store();
        let a = store.create_seed(details("a")).unwrap();
        let b = store.create_seed(details("b")).unwrap();
        store.authorize_seed_for_uid(a, 10, PURPOSE).unwrap();

        let found = store.find_unauthorized_seed(PURPOSE, 10, None).unwrap();
        assert_eq!(found.id, b);
        // a different uid still sees the first seed
        let found = store.find_unauthorized_seed(PURPOSE, 20, None).unwrap();
        assert_eq!(found.id, a);
        // filter by id
        assert!(store.find_unauthorized_seed(PURPOSE, 10, Some(a)).is_none());
        assert!(store.find_unauthorized_seed(PURPOSE, 10, Some(b)).is_some());
    }

    #[test]
    fn test_account_upsert() {
        let mut store = store();
        let id = store.create_seed(details("a")).unwrap();
        let p = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
        let first = store
            .add_or_get_account(id, PURPOSE, p.clone(), PublicKey::new([1; 32]))
            .unwrap();
        let second = store
            .add_or_get_account(id, PURPOSE, p, PublicKey::new([1; 32]))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.seed(id).unwrap().accounts.len(), 1);
        assert_eq!(first, 7000);
    }

    #[test]
    fn test_update_account_flag_error_kinds() {
        let mut store = store();
        let id = store.create_seed(details("a")).unwrap();
        let token = store.authorize_seed_for_uid(id, 10, PURPOSE).unwrap();
        let p = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
        let account = store
            .add_or_get_account(id, PURPOSE, p, PublicKey::new([1; 32]))
            .unwrap();

        // unknown token: invalid argument
        let bogus = AuthToken(token.0.wrapping_add(1));
        assert!(matches!(
            store.update_account_flag(10, bogus, account, AccountFlag::IsUserWallet, true),
            Err(EngineError::InvalidArgument(_))
        ));

        // unknown account id: not modified
        assert!(matches!(
            store.update_account_flag(10, token, 9999, AccountFlag::IsUserWallet, true),
            Err(EngineError::NotModified)
        ));

        // no-op value: not modified
        assert!(matches!(
            store.update_account_flag(10, token, account, AccountFlag::IsValid, false),
            Err(EngineError::NotModified)
        ));

        // real change succeeds
        store
            .update_account_flag(10, token, account, AccountFlag::IsUserWallet, true)
            .unwrap();
        assert!(store.seed(id).unwrap().accounts[0].is_user_wallet);
    }

    #[test]
    fn test_update_account_name() {
        let mut store = store();
        let id = store.create_seed(details("a")).unwrap();
        let token = store.authorize_seed_for_uid(id, 10, PURPOSE).unwrap();
        let p = path::resolve(PURPOSE, "bip32:/m/44'/501'/0'").unwrap();
        let account = store
            .add_or_get_account(id, PURPOSE, p, PublicKey::new([1; 32]))
            .unwrap();

        store
            .update_account_name(10, token, account, Some("Savings".to_string()))
            .unwrap();
        assert_eq!(
            store.seed(id).unwrap().accounts[0].name.as_deref(),
            Some("Savings")
        );
        // setting the same name again is a no-op
        assert!(matches!(
            store.update_account_name(10, token, account, Some("Savings".to_string())),
            Err(EngineError::NotModified)
        ));
    }

    #[test]
    fn test_delete_seed_cascades() {
        let mut store = store();
        let id = store.create_seed(details("a")).unwrap();
        let token = store.authorize_seed_for_uid(id, 10, PURPOSE).unwrap();
        store.delete_seed(id).unwrap();
        assert!(store.seed(id).is_none());
        assert!(store.seed_for_token(10, token).is_none());
        assert!(store.delete_seed(id).is_err());
    }

    #[test]
    fn test_delete_all_seeds() {
        let mut store = store();
        store.create_seed(details("a")).unwrap();
        store.create_seed(details("b")).unwrap();
        store.delete_all_seeds().unwrap();
        assert_eq!(store.seeds().count(), 0);
        assert!(!store.is_full());
    }

    #[test]
    fn test_remove_all_accounts() {
        let mut store = store();
        let id = store.create_seed(details("a")).unwrap();
        for i in 0..3 {
            let p = path::resolve(PURPOSE, &format!("bip32:/m/44'/501'/{i}'")).unwrap();
            store
                .add_or_get_account(id, PURPOSE, p, PublicKey::new([i as u8; 32]))
                .unwrap();
        }
        store.remove_all_accounts_for_seed(id).unwrap();
        assert!(store.seed(id).unwrap().accounts.is_empty());
    }
}
