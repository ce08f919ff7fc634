//! Engine configuration

use serde::{Deserialize, Serialize};

use warden_core::{ImplementationLimits, Purpose};

use crate::error::Result;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of seeds the store will hold
    pub max_seeds: usize,

    /// Account indices prepopulated per seed authorization (two path shapes
    /// each)
    pub prepopulate_accounts: u32,

    /// Request ceilings for the Solana signing purpose
    pub solana_limits: ImplementationLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_seeds: 4,
            prepopulate_accounts: 50,
            solana_limits: ImplementationLimits::for_purpose(Purpose::SignSolanaTransaction),
        }
    }
}

impl EngineConfig {
    /// The ceilings applied to a purpose
    pub fn limits_for(&self, purpose: Purpose) -> ImplementationLimits {
        match purpose {
            Purpose::SignSolanaTransaction => self.solana_limits,
        }
    }

    /// Load configuration from file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = EngineConfig::default();
        let limits = config.limits_for(Purpose::SignSolanaTransaction);
        assert_eq!(limits.max_signing_requests, 3);
        assert_eq!(limits.max_requested_signatures, 3);
        assert_eq!(limits.max_requested_public_keys, 10);
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let mut config = EngineConfig::default();
        config.prepopulate_accounts = 8;
        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.prepopulate_accounts, 8);
        assert_eq!(loaded.max_seeds, 4);
    }
}
