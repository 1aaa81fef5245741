//! CLI command implementations.

pub mod export;
pub mod fetch;
pub mod init;
pub mod inspect;
pub mod layout;
pub mod resolve;
pub mod seed;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scorigami_core::filter::{resolve as resolve_filter, FilterKey, RawFilter};
use scorigami_runtime::sqlite_store::SqliteStore;
use scorigami_runtime::store::{AggregateStore, MemoryStore};
use std::sync::Arc;

use crate::config::Config;

/// Filter selection flags shared by every graph command.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Best-of format: 3 or 5
    #[arg(short, long, default_value = "5")]
    pub sets: String,

    /// men, women or all
    #[arg(long, alias = "gender", default_value = "all")]
    pub sex: String,

    /// Event year, or "all"
    #[arg(short, long, default_value = "all")]
    pub year: String,

    /// Tournament id, or "all"
    #[arg(short, long, default_value = "all")]
    pub tournament: String,
}

impl FilterArgs {
    pub fn raw(&self) -> RawFilter {
        RawFilter::new(&self.sets, &self.sex, &self.year, &self.tournament)
    }

    /// Validate the flags into a key, with the user-facing message on error.
    pub fn key(&self) -> Result<FilterKey> {
        let resolved = resolve_filter(&self.raw()).map_err(|e| anyhow::anyhow!(e.message()))?;
        Ok(resolved.key)
    }
}

/// Open the store named by the config: the fixture when set, otherwise the
/// SQLite database.
pub fn open_store(config: &Config) -> Result<Arc<dyn AggregateStore>> {
    if let Some(path) = &config.store.fixture {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
        let store: MemoryStore = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fixture: {}", path.display()))?;
        return Ok(Arc::new(store));
    }

    let path = &config.store.path;
    if !path.exists() {
        anyhow::bail!(
            "No aggregate store at {}. Run {} first.",
            path.display(),
            "scorigami seed".cyan()
        );
    }
    let store = SqliteStore::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(sets: &str, sex: &str) -> FilterArgs {
        FilterArgs {
            sets: sets.to_string(),
            sex: sex.to_string(),
            year: "all".to_string(),
            tournament: "all".to_string(),
        }
    }

    #[test]
    fn filter_args_report_plain_messages() {
        let err = args("5", "women").key().unwrap_err();
        assert_eq!(err.to_string(), "women only play best of 3 sets");
        assert!(args("3", "women").key().is_ok());
    }

    #[test]
    fn missing_database_points_at_seed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.path = dir.path().join("absent.db");
        let err = open_store(&config).err().unwrap();
        assert!(err.to_string().contains("scorigami seed"));
    }
}
