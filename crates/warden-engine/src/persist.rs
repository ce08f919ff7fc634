//! Persistence collaborator
//!
//! The store snapshots its full state after every mutation and hands it to a
//! `PersistentStore`. The engine assumes the backing store is reliable and
//! platform-protected; it does not encrypt at rest.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::Seed;

/// Full store state as written to durable storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub seeds: Vec<Seed>,
    pub next_seed_id: u64,
    pub next_account_id: u64,
}

/// Durable CRUD collaborator for the seed store
pub trait PersistentStore: Send + Sync {
    /// Load the last saved snapshot, if one exists
    fn load(&self) -> Result<Option<StoreSnapshot>>;

    /// Replace the saved snapshot
    fn save(&self, snapshot: &StoreSnapshot) -> Result<()>;
}

/// Volatile store for tests and ephemeral vaults
#[derive(Debug, Default)]
pub struct NullStore;

impl PersistentStore for NullStore {
    fn load(&self) -> Result<Option<StoreSnapshot>> {
        Ok(None)
    }

    fn save(&self, _snapshot: &StoreSnapshot) -> Result<()> {
        Ok(())
    }
}

/// JSON-file-backed store
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistentStore for JsonFileStore {
    fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
