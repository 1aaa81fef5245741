//! Generate synthetic aggregates.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use scorigami_runtime::sqlite_store::SqliteStore;
use scorigami_runtime::synthetic::{generate, SyntheticConfig};
use std::path::{Path, PathBuf};

use crate::config::Config;

pub fn run(
    config: &Config,
    output: Option<String>,
    format: &str,
    matches: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let synthetic = SyntheticConfig {
        matches: matches.unwrap_or(config.synthetic.matches),
        seed: seed.unwrap_or(config.synthetic.seed),
        ..config.synthetic
    };

    println!(
        "{} Generating {} synthetic matches (seed {})...",
        "→".blue(),
        synthetic.matches,
        synthetic.seed
    );
    let store = generate(&synthetic);
    for (view, nodes, edges) in store.stats() {
        println!("  {:<12} {:>7} nodes {:>7} edges", format!("{:?}", view), nodes, edges);
    }

    match format {
        "sqlite" => {
            let path = output.map(PathBuf::from).unwrap_or_else(|| config.store.path.clone());
            let db = SqliteStore::open(&path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?;
            let rows = db.import(&store)?;
            println!("{} Wrote {} rows to {}", "✓".green(), rows, path.display());
        }
        "json" => {
            let path = output
                .map(PathBuf::from)
                .or_else(|| config.store.fixture.clone())
                .unwrap_or_else(|| PathBuf::from("scorigami.json"));
            write_json(&store, &path)?;
            println!("{} Wrote fixture to {}", "✓".green(), path.display());
        }
        other => bail!("Unknown format: {}. Use json or sqlite.", other),
    }

    Ok(())
}

fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorigami_runtime::store::MemoryStore;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.synthetic.matches = 50;
        config.synthetic.enumerate_depth = 1;
        config
    }

    #[test]
    fn json_fixture_reloads_as_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        run(&small_config(), Some(path.display().to_string()), "json", None, None).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let store: MemoryStore = serde_json::from_str(&raw).unwrap();
        let generated = generate(&small_config().synthetic);
        assert_eq!(store.stats(), generated.stats());
    }

    #[test]
    fn sqlite_seed_matches_generated_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agg.db");
        run(&small_config(), Some(path.display().to_string()), "sqlite", None, None).unwrap();

        let db = SqliteStore::open(&path).unwrap();
        let generated = generate(&small_config().synthetic);
        assert_eq!(db.stats().unwrap(), generated.stats());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = run(&small_config(), None, "csv", None, None).unwrap_err();
        assert!(err.to_string().contains("Unknown format"));
    }
}
