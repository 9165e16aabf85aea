//! Ledger configuration and BOM seed data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use bomledger_inventory::DeviceType;

use crate::error::{LedgerError, LedgerResult};

pub const DATABASE_URL_ENV: &str = "BOMLEDGER_DATABASE_URL";
pub const BOM_SEED_ENV: &str = "BOMLEDGER_BOM_SEED";

/// Where the ledger lives and what it is seeded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// SQLite connection URL (`sqlite://path/to/ledger.db` or `sqlite::memory:`).
    pub database_url: String,
    /// Optional JSON seed file applied on every open.
    pub bom_seed: Option<PathBuf>,
}

impl LedgerConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            bom_seed: None,
        }
    }

    /// Private in-memory database; everything is lost when the ledger closes.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    pub fn with_seed(mut self, path: impl Into<PathBuf>) -> Self {
        self.bom_seed = Some(path.into());
        self
    }

    /// Read `BOMLEDGER_DATABASE_URL` / `BOMLEDGER_BOM_SEED`.
    ///
    /// Without a database URL the ledger lives at `{app_data_dir}/bomledger/ledger.db`.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = match std::env::var(DATABASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                let path = default_db_path()?;
                format!("sqlite://{}", path.to_string_lossy())
            }
        };

        let bom_seed = std::env::var_os(BOM_SEED_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            database_url,
            bom_seed,
        })
    }
}

/// Static BOM configuration applied at initialization.
///
/// ```json
/// {
///   "requirements": { "VH": { "Coil": 2, "Case": 1 } },
///   "stock": { "Coil": 5, "Case": 3 }
/// }
/// ```
///
/// `stock` only initializes pools that do not exist yet; reseeding never
/// overwrites live quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomSeed {
    #[serde(default)]
    pub requirements: BTreeMap<DeviceType, BTreeMap<String, i64>>,
    #[serde(default)]
    pub stock: BTreeMap<String, i64>,
}

impl BomSeed {
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("failed to read BOM seed {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            LedgerError::Config(format!("failed to parse BOM seed {}: {e}", path.display()))
        })
    }
}

/// Resolve the default database location, creating its directory.
fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut dir = base;
    dir.push("bomledger");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create ledger directory at {:?}", dir))?;

    dir.push("ledger.db");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_parses_requirements_and_stock() {
        let seed: BomSeed = serde_json::from_str(
            r#"{ "requirements": { "VH": { "Coil": 2, "Case": 1 } }, "stock": { "Coil": 5 } }"#,
        )
        .unwrap();

        assert_eq!(seed.requirements[&DeviceType::Vh]["Coil"], 2);
        assert_eq!(seed.stock["Coil"], 5);
        assert!(!seed.requirements.contains_key(&DeviceType::Vp));
    }

    #[test]
    fn seed_sections_are_optional() {
        let seed: BomSeed = serde_json::from_str("{}").unwrap();
        assert_eq!(seed, BomSeed::default());
    }

    #[test]
    fn seed_rejects_unknown_device_types() {
        assert!(serde_json::from_str::<BomSeed>(r#"{ "requirements": { "VX": {} } }"#).is_err());
    }
}
