//! Lay out a selection against the local store.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use scorigami_runtime::encoder::FrameEncoder;
use scorigami_runtime::executor::{AggregateExecutor, ExecutorConfig};
use scorigami_runtime::loader::{GraphLoader, LoadStatus, LocalFrameSource};
use scorigami_runtime::render::{RenderGraph, RenderOptions};
use std::path::Path;
use std::sync::Arc;

use super::fetch::print_summary;
use super::{open_store, FilterArgs};
use crate::config::Config;

/// Run one selection through the loader and return the prepared graph.
pub async fn render_local(config: &Config, filter: &FilterArgs, options: RenderOptions) -> Result<Arc<RenderGraph>> {
    let key = filter.key()?;
    let store = open_store(config)?;
    let executor = Arc::new(AggregateExecutor::new(store, ExecutorConfig::default()));
    let source = LocalFrameSource::new(executor, FrameEncoder::new(config.stream.unpaced()));
    let loader = GraphLoader::new(Arc::new(source), options);

    let mut status = loader.subscribe();
    let generation = loader.load(key);
    loop {
        let current = status.borrow_and_update().clone();
        if current.generation() == generation && current.is_settled() {
            return match current {
                LoadStatus::Ready { graph, .. } => Ok(graph),
                LoadStatus::Failed { message, .. } => bail!(message),
                _ => bail!("Layout of {} was cancelled", key),
            };
        }
        status
            .changed()
            .await
            .context("Loader stopped before finishing")?;
    }
}

pub async fn run(
    config: &Config,
    filter: &FilterArgs,
    output: Option<String>,
    options: RenderOptions,
) -> Result<()> {
    println!("{} Laying out {}...", "→".blue(), filter.key()?);
    let graph = render_local(config, filter, options).await?;
    print_summary(&graph);

    if let Some(path) = output {
        let path = Path::new(&path);
        let json = serde_json::to_vec_pretty(graph.as_ref())?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Wrote render graph to {}", "✓".green(), path.display());
    }
    Ok(())
}
