//! Initialize a new scorigami project.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};

pub fn run(path: Option<String>) -> Result<()> {
    let base_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    println!("{} Initializing scorigami project...", "→".blue());

    std::fs::create_dir_all(&base_path)
        .with_context(|| format!("Failed to create {}", base_path.display()))?;

    let config_path = base_path.join(CONFIG_FILE);
    if !config_path.exists() {
        Config::default().save(&config_path)?;
        println!("  {} Created {}", "✓".green(), config_path.display());
    } else {
        println!("  {} {} already exists", "•".yellow(), config_path.display());
    }

    let gitignore_path = base_path.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, "*.db\n*.ndjson\n")?;
        println!("  {} Created {}", "✓".green(), gitignore_path.display());
    }

    println!();
    println!("{} Project initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  {} scorigami seed", "1.".blue());
    println!("  {} scorigami layout --sets 3 --sex women", "2.".blue());
    println!("  {} scorigami fetch --sets 5 (against a running scorigami-web)", "3.".blue());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("project");
        run(Some(target.display().to_string())).unwrap();

        let config_path = target.join(CONFIG_FILE);
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.store.path, target.join("scorigami.db"));

        std::fs::write(&config_path, "[server]\nurl = \"http://example:9\"\n").unwrap();
        run(Some(target.display().to_string())).unwrap();
        let kept = Config::load_from(&config_path).unwrap();
        assert_eq!(kept.server.url, "http://example:9");
    }
}
