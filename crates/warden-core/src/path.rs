//! BIP32/BIP44 derivation path model
//!
//! Paths arrive from clients as URI strings (`bip32:/m/44'/501'/0'` or
//! `bip44:/0'/0/1`) and are normalized per purpose before any derivation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::purpose::Purpose;

/// URI scheme for raw BIP32 paths
pub const BIP32_URI_SCHEME: &str = "bip32";

/// URI scheme for BIP44-style paths (account/change/address-index)
pub const BIP44_URI_SCHEME: &str = "bip44";

/// Maximum number of levels in a BIP32 path
pub const BIP32_MAX_DEPTH: usize = 20;

/// BIP44 purpose level value
pub const BIP44_PURPOSE: u32 = 44;

/// First hardened index (2^31); indices must be below this
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

const MASTER_KEY_INDICATOR: &str = "m";
const HARDENED_MARKER: char = '\'';

/// One level of a derivation path
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BipLevel {
    /// Index value (always < 2^31; the hardened bit is carried separately)
    pub index: u32,
    /// Whether this level uses hardened derivation
    pub hardened: bool,
}

impl BipLevel {
    /// Create a normal (non-hardened) level
    pub fn normal(index: u32) -> Self {
        Self {
            index,
            hardened: false,
        }
    }

    /// Create a hardened level
    pub fn hardened(index: u32) -> Self {
        Self {
            index,
            hardened: true,
        }
    }

    /// Get the value to use in derivation (adds 2^31 for hardened)
    pub fn value(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }

    fn parse_segment(segment: &str, position: usize) -> Result<Self> {
        let hardened = segment.ends_with(HARDENED_MARKER);
        let digits = if hardened {
            &segment[..segment.len() - 1]
        } else {
            segment
        };
        let index: u32 = digits.parse().map_err(|_| {
            Error::InvalidDerivationPath(format!(
                "Path element [{position}]({segment}) could not be parsed as a BIP level"
            ))
        })?;
        if index >= HARDENED_OFFSET {
            return Err(Error::InvalidDerivationPath(format!(
                "Path element [{position}] index {index} exceeds the hardened index range"
            )));
        }
        Ok(Self { index, hardened })
    }
}

impl fmt::Display for BipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)?;
        if self.hardened {
            write!(f, "{HARDENED_MARKER}")?;
        }
        Ok(())
    }
}

/// A raw BIP32 derivation path (e.g., m/44'/501'/0')
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Bip32Path {
    levels: Vec<BipLevel>,
}

impl Bip32Path {
    /// Create a new path from levels
    pub fn new(levels: Vec<BipLevel>) -> Result<Self> {
        if levels.len() > BIP32_MAX_DEPTH {
            return Err(Error::InvalidDerivationPath(format!(
                "BIP32 max supported depth ({BIP32_MAX_DEPTH}) exceeded"
            )));
        }
        Ok(Self { levels })
    }

    /// Get the levels of this path
    pub fn levels(&self) -> &[BipLevel] {
        &self.levels
    }

    /// Number of levels
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Append the given levels, producing a new path
    pub fn extended(&self, levels: &[BipLevel]) -> Result<Self> {
        let mut all = self.levels.clone();
        all.extend_from_slice(levels);
        Self::new(all)
    }

    /// Canonicalize this path for the given purpose. Normalizing an
    /// already-normalized path returns it unchanged.
    pub fn normalize(self, purpose: Purpose) -> Self {
        match purpose {
            Purpose::SignSolanaTransaction => self.harden_all_levels(),
        }
    }

    /// True iff this path's levels are an equal-or-strict prefix of `path`'s,
    /// element-wise including the hardened flag
    pub fn is_ancestor_of(&self, path: &Bip32Path) -> bool {
        if self.levels.len() > path.levels.len() {
            return false;
        }
        self.levels
            .iter()
            .zip(path.levels.iter())
            .all(|(a, b)| a == b)
    }

    /// Serialize to the URI form (e.g., `bip32:/m/44'/501'/0'`)
    pub fn to_uri(&self) -> String {
        let mut uri = format!("{BIP32_URI_SCHEME}:/{MASTER_KEY_INDICATOR}");
        for level in &self.levels {
            uri.push('/');
            uri.push_str(&level.to_string());
        }
        uri
    }

    fn harden_all_levels(self) -> Self {
        if self.levels.iter().all(|level| level.hardened) {
            return self;
        }
        Self {
            levels: self
                .levels
                .into_iter()
                .map(|level| BipLevel::hardened(level.index))
                .collect(),
        }
    }

    fn parse_segments(segments: &[&str]) -> Result<Self> {
        match segments.first() {
            Some(&MASTER_KEY_INDICATOR) => {}
            _ => {
                return Err(Error::InvalidDerivationPath(
                    "BIP32 URI path must start with a master key indicator".to_string(),
                ))
            }
        }
        let levels = segments[1..]
            .iter()
            .enumerate()
            .map(|(i, segment)| BipLevel::parse_segment(segment, i + 1))
            .collect::<Result<Vec<_>>>()?;
        Self::new(levels)
    }
}

impl fmt::Display for Bip32Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MASTER_KEY_INDICATOR}")?;
        for level in &self.levels {
            write!(f, "/{level}")?;
        }
        Ok(())
    }
}

/// A BIP44-style derivation path (account, optional change, optional
/// address index), relative to a purpose-specific prefix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Bip44Path {
    account: BipLevel,
    change: Option<BipLevel>,
    address_index: Option<BipLevel>,
}

impl Bip44Path {
    /// Create a new BIP44 path. The account level must be hardened, and an
    /// address index may only be present when a change level is.
    pub fn new(
        account: BipLevel,
        change: Option<BipLevel>,
        address_index: Option<BipLevel>,
    ) -> Result<Self> {
        if !account.hardened {
            return Err(Error::InvalidDerivationPath(
                "BIP44 account level must be hardened".to_string(),
            ));
        }
        if change.is_none() && address_index.is_some() {
            return Err(Error::InvalidDerivationPath(
                "BIP44 address index requires a change level".to_string(),
            ));
        }
        Ok(Self {
            account,
            change,
            address_index,
        })
    }

    /// The levels of this path, in order
    pub fn levels(&self) -> Vec<BipLevel> {
        let mut levels = vec![self.account];
        if let Some(change) = self.change {
            levels.push(change);
        }
        if let Some(address_index) = self.address_index {
            levels.push(address_index);
        }
        levels
    }

    /// Canonicalize for the given purpose
    pub fn normalize(self, purpose: Purpose) -> Self {
        match purpose {
            Purpose::SignSolanaTransaction => self.harden_all_levels(),
        }
    }

    /// Expand into the purpose-specific BIP32 form: the fixed
    /// purpose/coin-type prefix followed by this path's hardened levels
    pub fn to_bip32(self, purpose: Purpose) -> Result<Bip32Path> {
        let mut levels = vec![
            BipLevel::hardened(BIP44_PURPOSE),
            BipLevel::hardened(purpose.coin_type()),
        ];
        levels.extend(self.normalize(purpose).levels());
        Bip32Path::new(levels)
    }

    /// Serialize to the URI form (e.g., `bip44:/0'/0/1`)
    pub fn to_uri(&self) -> String {
        let mut uri = format!("{BIP44_URI_SCHEME}:/{}", self.account);
        if let Some(change) = self.change {
            uri.push('/');
            uri.push_str(&change.to_string());
        }
        if let Some(address_index) = self.address_index {
            uri.push('/');
            uri.push_str(&address_index.to_string());
        }
        uri
    }

    fn harden_all_levels(self) -> Self {
        if self.levels().iter().all(|level| level.hardened) {
            return self;
        }
        Self {
            account: BipLevel::hardened(self.account.index),
            change: self.change.map(|level| BipLevel::hardened(level.index)),
            address_index: self
                .address_index
                .map(|level| BipLevel::hardened(level.index)),
        }
    }

    fn parse_segments(segments: &[&str]) -> Result<Self> {
        if segments.is_empty() || segments.len() > 3 {
            return Err(Error::InvalidDerivationPath(format!(
                "BIP44 URI must have 1 to 3 levels; found {}",
                segments.len()
            )));
        }
        let mut levels = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| BipLevel::parse_segment(segment, i + 1))
            .collect::<Result<Vec<_>>>()?;
        let account = levels.remove(0);
        let change = if levels.is_empty() {
            None
        } else {
            Some(levels.remove(0))
        };
        let address_index = levels.pop();
        Self::new(account, change, address_index)
    }
}

/// Either flavor of client-supplied derivation path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BipPath {
    Bip32(Bip32Path),
    Bip44(Bip44Path),
}

impl BipPath {
    /// Parse a scheme-prefixed derivation path URI
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri.split_once(":/").ok_or_else(|| {
            Error::InvalidDerivationPath(format!("Derivation path URI '{uri}' has no scheme"))
        })?;
        if rest.contains('?') || rest.contains('#') || rest.starts_with('/') {
            return Err(Error::InvalidDerivationPath(format!(
                "Derivation path URI '{uri}' must be a plain hierarchical path"
            )));
        }
        let segments: Vec<&str> = rest.split('/').collect();
        match scheme {
            BIP32_URI_SCHEME => Ok(BipPath::Bip32(Bip32Path::parse_segments(&segments)?)),
            BIP44_URI_SCHEME => Ok(BipPath::Bip44(Bip44Path::parse_segments(&segments)?)),
            _ => Err(Error::InvalidDerivationPath(format!(
                "Unknown derivation path scheme '{scheme}'"
            ))),
        }
    }

    /// Expand to the BIP32 form for the given purpose. A BIP32 path passes
    /// through unchanged; a BIP44 path gains the purpose-specific prefix.
    pub fn to_bip32(self, purpose: Purpose) -> Result<Bip32Path> {
        match self {
            BipPath::Bip32(path) => Ok(path),
            BipPath::Bip44(path) => path.to_bip32(purpose),
        }
    }

    /// Serialize back to the URI form; `parse(p.to_uri()) == p`
    pub fn to_uri(&self) -> String {
        match self {
            BipPath::Bip32(path) => path.to_uri(),
            BipPath::Bip44(path) => path.to_uri(),
        }
    }
}

/// Parse, expand, and canonicalize one client-supplied path
pub fn resolve(purpose: Purpose, uri: &str) -> Result<Bip32Path> {
    Ok(BipPath::parse(uri)?.to_bip32(purpose)?.normalize(purpose))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_value() {
        assert_eq!(BipLevel::normal(0).value(), 0);
        assert_eq!(BipLevel::hardened(0).value(), 0x8000_0000);
        assert_eq!(BipLevel::hardened(44).value(), 0x8000_002C);
    }

    #[test]
    fn test_parse_bip32() {
        let path = BipPath::parse("bip32:/m/44'/501'/0'").unwrap();
        let BipPath::Bip32(path) = path else {
            panic!("expected BIP32 flavor");
        };
        assert_eq!(
            path.levels(),
            &[
                BipLevel::hardened(44),
                BipLevel::hardened(501),
                BipLevel::hardened(0)
            ]
        );
    }

    #[test]
    fn test_parse_bip32_master_only() {
        let BipPath::Bip32(path) = BipPath::parse("bip32:/m").unwrap() else {
            panic!("expected BIP32 flavor");
        };
        assert!(path.levels().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(BipPath::parse("bip32:/44'/501'").is_err()); // no master indicator
        assert!(BipPath::parse("bip32:/m/x'").is_err());
        assert!(BipPath::parse("bip32:/m/44''").is_err());
        assert!(BipPath::parse("m/44'").is_err()); // no scheme
        assert!(BipPath::parse("bip99:/m/44'").is_err());
        assert!(BipPath::parse("bip32:/m/2147483648").is_err()); // >= 2^31
    }

    #[test]
    fn test_parse_rejects_too_deep() {
        let mut uri = String::from("bip32:/m");
        for _ in 0..=BIP32_MAX_DEPTH {
            uri.push_str("/0'");
        }
        assert!(BipPath::parse(&uri).is_err());
    }

    #[test]
    fn test_uri_roundtrip() {
        for uri in ["bip32:/m/44'/501'/0'/1", "bip44:/0'/0/3", "bip44:/7'"] {
            let path = BipPath::parse(uri).unwrap();
            assert_eq!(path.to_uri(), uri);
            assert_eq!(BipPath::parse(&path.to_uri()).unwrap(), path);
        }
    }

    #[test]
    fn test_bip44_invariants() {
        // account must be hardened
        assert!(Bip44Path::new(BipLevel::normal(0), None, None).is_err());
        // address index requires change
        assert!(Bip44Path::new(BipLevel::hardened(0), None, Some(BipLevel::normal(1))).is_err());
    }

    #[test]
    fn test_bip44_expansion() {
        let path = Bip44Path::new(
            BipLevel::hardened(2),
            Some(BipLevel::normal(0)),
            Some(BipLevel::normal(5)),
        )
        .unwrap();
        let bip32 = path.to_bip32(Purpose::SignSolanaTransaction).unwrap();
        assert_eq!(
            bip32.levels(),
            &[
                BipLevel::hardened(44),
                BipLevel::hardened(501),
                BipLevel::hardened(2),
                BipLevel::hardened(0),
                BipLevel::hardened(5),
            ]
        );
    }

    #[test]
    fn test_normalize_hardens_all_levels() {
        let path = Bip32Path::new(vec![BipLevel::hardened(44), BipLevel::normal(501)]).unwrap();
        let normalized = path.normalize(Purpose::SignSolanaTransaction);
        assert!(normalized.levels().iter().all(|level| level.hardened));
    }

    #[test]
    fn test_normalize_idempotent() {
        let path = resolve(Purpose::SignSolanaTransaction, "bip32:/m/44'/501/9").unwrap();
        assert_eq!(path.clone().normalize(Purpose::SignSolanaTransaction), path);
    }

    #[test]
    fn test_is_ancestor_of() {
        let ancestor = resolve(Purpose::SignSolanaTransaction, "bip32:/m/44'/501'").unwrap();
        let child = resolve(Purpose::SignSolanaTransaction, "bip32:/m/44'/501'/0'").unwrap();
        assert!(ancestor.is_ancestor_of(&child));
        assert!(ancestor.is_ancestor_of(&ancestor));
        assert!(!child.is_ancestor_of(&ancestor));

        // hardened flag must match element-wise
        let soft = Bip32Path::new(vec![BipLevel::normal(44), BipLevel::normal(501)]).unwrap();
        assert!(!soft.is_ancestor_of(&child));
    }
}
