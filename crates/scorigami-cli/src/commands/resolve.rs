//! Show how a filter selection resolves to an aggregate.

use anyhow::Result;
use colored::Colorize;

use super::FilterArgs;
use scorigami_core::filter::resolve;

pub fn run(filter: &FilterArgs) -> Result<()> {
    let resolved = resolve(&filter.raw()).map_err(|e| anyhow::anyhow!(e.message()))?;
    let key = resolved.key;

    println!("{} {}", "Key:".bold(), key);
    println!("  {:<12} {:?}", "view", key.view());
    println!(
        "  {:<12} {}",
        "kind",
        if resolved.use_rollup { "rollup" } else { "detail" }
    );
    println!("  {:<12} {}", "nodes", resolved.source.nodes_relation().cyan());
    println!("  {:<12} {}", "edges", resolved.source.edges_relation().cyan());
    if !resolved.use_rollup {
        println!("  {:<12} {}", "base", resolved.source.base_nodes_relation().cyan());
    }
    println!("  {:<12} {}", "query", key.to_query_string());
    println!("  {:<12} {:#018x}", "seed", key.seed());

    Ok(())
}
