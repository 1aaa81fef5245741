//! Export the dataset for one filter selection.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use scorigami_runtime::encoder::FrameEncoder;
use scorigami_runtime::executor::{AggregateExecutor, ExecutorConfig};
use std::path::Path;

use super::{open_store, FilterArgs};
use crate::config::Config;

pub async fn run(config: &Config, filter: &FilterArgs, output: &str, format: &str) -> Result<()> {
    let key = filter.key()?;
    let store = open_store(config)?;
    let executor = AggregateExecutor::new(store, ExecutorConfig::default());

    println!("{} Querying {} from {}...", "→".blue(), key, executor.store().name());
    let dataset = executor.fetch_uncached(&key).await?;

    let bytes = match format {
        "json" => serde_json::to_vec_pretty(&dataset)?,
        "ndjson" => FrameEncoder::new(config.stream).encode_to_vec(&dataset)?,
        other => bail!("Unknown format: {}. Use json or ndjson.", other),
    };
    let path = Path::new(output);
    std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} Exported {} nodes and {} edges to {}",
        "✓".green(),
        dataset.nodes.len(),
        dataset.edges.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorigami_core::frame::StreamFrame;
    use scorigami_core::types::GraphDataset;
    use scorigami_runtime::synthetic::generate;

    fn fixture_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.synthetic.matches = 80;
        config.synthetic.enumerate_depth = 2;
        let fixture = dir.join("fixture.json");
        let store = generate(&config.synthetic);
        std::fs::write(&fixture, serde_json::to_string(&store).unwrap()).unwrap();
        config.store.fixture = Some(fixture);
        config.stream.node_batch = 10;
        config
    }

    fn filter() -> FilterArgs {
        FilterArgs {
            sets: "3".to_string(),
            sex: "all".to_string(),
            year: "all".to_string(),
            tournament: "all".to_string(),
        }
    }

    #[tokio::test]
    async fn json_and_ndjson_agree() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path());
        let json_path = dir.path().join("graph.json");
        let ndjson_path = dir.path().join("graph.ndjson");

        run(&config, &filter(), json_path.to_str().unwrap(), "json").await.unwrap();
        run(&config, &filter(), ndjson_path.to_str().unwrap(), "ndjson").await.unwrap();

        let dataset: GraphDataset =
            serde_json::from_slice(&std::fs::read(&json_path).unwrap()).unwrap();
        let text = std::fs::read_to_string(&ndjson_path).unwrap();
        let frames: Vec<StreamFrame> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(
            frames[0],
            StreamFrame::Meta {
                total_nodes: dataset.nodes.len(),
                total_edges: dataset.edges.len(),
            }
        );
        assert_eq!(frames.last(), Some(&StreamFrame::Complete));
    }

    #[tokio::test]
    async fn invalid_selection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(dir.path());
        let out = dir.path().join("never.json");
        let bad = FilterArgs {
            sets: "5".to_string(),
            sex: "women".to_string(),
            ..filter()
        };
        assert!(run(&config, &bad, out.to_str().unwrap(), "json").await.is_err());
        assert!(!out.exists());
    }
}
