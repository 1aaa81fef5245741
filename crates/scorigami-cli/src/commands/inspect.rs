//! Decode a saved NDJSON stream and report what it holds.

use anyhow::{Context, Result};
use colored::Colorize;
use scorigami_core::assemble::{assemble_with_report, check_acyclic};
use scorigami_core::tier::LayoutTier;
use scorigami_runtime::cancel::CancelToken;
use scorigami_runtime::decoder::{decode_reader, DecodeOutcome, FrameDecoder};
use serde::Serialize;
use std::path::Path;

/// What `inspect` found in a stream file.
#[derive(Debug, Serialize)]
pub struct StreamInspection {
    pub complete: bool,
    pub declared_nodes: Option<usize>,
    pub declared_edges: Option<usize>,
    pub nodes: usize,
    pub edges: usize,
    pub parse_errors: usize,
    pub duplicates: usize,
    pub orphan_edges: usize,
    pub scorigami: usize,
    pub max_depth: u32,
    pub tier: LayoutTier,
    pub acyclic: bool,
}

pub async fn inspect_file(path: &Path) -> Result<StreamInspection> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut decoder = FrameDecoder::new();
    let outcome = decode_reader(file, &mut decoder, &CancelToken::new(), |_| {}).await?;
    let complete = matches!(outcome, DecodeOutcome::Finished { complete: true });

    let progress = decoder.progress();
    let parse_errors = decoder.parse_errors();
    let duplicates = decoder.duplicates();
    let (nodes, edges) = decoder.into_parts();
    let acyclic = check_acyclic(&nodes, &edges).is_ok();
    let (dataset, report) = assemble_with_report(nodes, edges);

    Ok(StreamInspection {
        complete,
        declared_nodes: progress.total_nodes,
        declared_edges: progress.total_edges,
        nodes: dataset.node_count(),
        edges: dataset.edge_count(),
        parse_errors,
        duplicates,
        orphan_edges: report.orphan_edges,
        scorigami: dataset.scorigami_count(),
        max_depth: dataset.max_depth(),
        tier: LayoutTier::from_node_count(dataset.node_count()),
        acyclic,
    })
}

pub async fn run(path: &str, json: bool) -> Result<()> {
    let inspection = inspect_file(Path::new(path)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    println!("{}", "Stream".bold());
    println!(
        "  {:<14} {}",
        "complete",
        if inspection.complete { "yes".green() } else { "no".red() }
    );
    println!(
        "  {:<14} {} / {}",
        "nodes",
        inspection.nodes,
        declared(inspection.declared_nodes)
    );
    println!(
        "  {:<14} {} / {}",
        "edges",
        inspection.edges,
        declared(inspection.declared_edges)
    );
    println!("  {:<14} {}", "scorigami", inspection.scorigami);
    println!("  {:<14} {}", "max depth", inspection.max_depth);
    println!("  {:<14} {:?}", "tier", inspection.tier);
    if inspection.parse_errors + inspection.duplicates + inspection.orphan_edges > 0 {
        println!(
            "  {:<14} {}",
            "problems",
            format!(
                "{} bad lines, {} duplicates, {} orphan edges",
                inspection.parse_errors, inspection.duplicates, inspection.orphan_edges
            )
            .yellow()
        );
    }
    if !inspection.acyclic {
        println!("  {} stream contains a cycle", "✗".red());
    }
    Ok(())
}

fn declared(total: Option<usize>) -> String {
    total.map_or_else(|| "?".to_string(), |t| t.to_string())
}
