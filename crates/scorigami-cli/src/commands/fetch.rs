//! Stream a graph from a running server and prepare it for rendering.

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use scorigami_runtime::cancel::CancelToken;
use scorigami_runtime::loader::fetch_render_graph;
use scorigami_runtime::render::{RenderGraph, RenderOptions};
use std::path::Path;
use std::time::Duration;

use super::FilterArgs;
use crate::config::Config;
use crate::http_source::HttpFrameSource;

pub async fn run(
    config: &Config,
    filter: &FilterArgs,
    server: Option<String>,
    output: Option<String>,
    options: RenderOptions,
) -> Result<()> {
    let key = filter.key()?;
    let base = server.unwrap_or_else(|| config.server.url.clone());
    let source = HttpFrameSource::new(&base, Duration::from_secs(config.server.timeout_secs))?;

    println!("{} Streaming {} from {}...", "→".blue(), key, base);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = fetch_render_graph(&source, &key, &options, &cancel, |progress| {
        if let (Some(nodes), Some(edges)) = (progress.total_nodes, progress.total_edges) {
            pb.set_length((nodes + edges) as u64);
        }
        pb.set_position((progress.loaded_nodes + progress.loaded_edges) as u64);
        pb.set_message(format!(
            "{} nodes, {} edges",
            progress.loaded_nodes, progress.loaded_edges
        ));
    })
    .await;
    interrupt.abort();

    let graph = match result? {
        Some(graph) => graph,
        None => {
            pb.abandon_with_message("cancelled");
            println!("{} Load cancelled", "•".yellow());
            return Ok(());
        }
    };
    pb.finish_with_message("decoded");

    print_summary(&graph);
    if let Some(path) = output {
        let path = Path::new(&path);
        let json = serde_json::to_vec(&graph)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Wrote render graph to {}", "✓".green(), path.display());
    }
    Ok(())
}

/// Shared by `fetch` and `layout`.
pub fn print_summary(graph: &RenderGraph) {
    println!();
    println!("{}", "Render Graph".bold());
    println!("  {:<14} {:?}", "tier", graph.tier);
    println!("  {:<14} {}", "color mode", graph.color_mode);
    println!("  {:<14} {}", "nodes", graph.nodes.len());
    println!("  {:<14} {}", "edges", graph.edges.len());

    let unplayed = graph.nodes.iter().filter(|n| !n.played).count();
    println!("  {:<14} {}", "never played", unplayed.to_string().red());

    if !graph.assembly.is_clean() {
        println!(
            "  {:<14} {}",
            "assembly",
            format!(
                "{} duplicate nodes, {} duplicate edges, {} orphan edges dropped",
                graph.assembly.duplicate_nodes, graph.assembly.duplicate_edges, graph.assembly.orphan_edges
            )
            .yellow()
        );
    }
    if graph.reduction.active {
        println!(
            "  {:<14} {} -> {} edges",
            "reduced",
            graph.reduction.input_edges,
            graph.reduction.input_edges - graph.reduction.dropped
        );
    }
    println!(
        "  {:<14} {:?} after {} iterations ({} ms)",
        "layout", graph.layout.state, graph.layout.iterations, graph.layout.elapsed_ms
    );
}
