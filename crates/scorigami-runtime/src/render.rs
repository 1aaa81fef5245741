//! Render-graph preparation.
//!
//! Decoded lists in, renderer-ready graph out: assemble, reduce, lay out,
//! encode. The blocking variant is for batch and server use; the
//! cooperative variant yields between layout slices and honours a
//! [`CancelToken`].

use crate::cancel::CancelToken;
use crate::encoding::{
    edge_color, edge_depth, edge_width, node_border, node_color, node_size, DepthScales, NodeColorMode,
};
use crate::layout::{LayoutEngine, LayoutOptions, LayoutReport, LayoutState};
use crate::reducer::{EdgeReducer, ReducerConfig, ReductionReport};
use crate::scheduler::{run_blocking, run_cooperative};
use scorigami_core::assemble::{assemble_with_report, AssemblyReport};
use scorigami_core::tier::LayoutTier;
use scorigami_core::types::{Edge, GraphDataset, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Everything the pipeline needs besides the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    #[serde(default)]
    pub color_mode: NodeColorMode,
    #[serde(default)]
    pub layout: LayoutOptions,
    #[serde(default)]
    pub reducer: ReducerConfig,
}

/// A node as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub id: NodeId,
    pub slug: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: String,
    pub border_size: f64,
    pub border_color: String,
    pub depth: u32,
    pub played: bool,
    pub occurrences: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub color: String,
    pub size: f64,
}

/// Laid-out, encoded graph plus what each stage did to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderGraph {
    pub tier: LayoutTier,
    pub color_mode: NodeColorMode,
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub assembly: AssemblyReport,
    pub reduction: ReductionReport,
    pub layout: LayoutReport,
}

impl RenderGraph {
    pub fn node(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Assembled and reduced, ready for layout.
struct Staged {
    dataset: GraphDataset,
    assembly: AssemblyReport,
    reduction: ReductionReport,
}

fn stage(nodes: Vec<Node>, edges: Vec<Edge>, seed: u64, reducer: ReducerConfig) -> Staged {
    let (mut dataset, assembly) = assemble_with_report(nodes, edges);
    if !assembly.is_clean() {
        warn!(
            duplicate_nodes = assembly.duplicate_nodes,
            duplicate_edges = assembly.duplicate_edges,
            orphan_edges = assembly.orphan_edges,
            "assembly dropped input"
        );
    }
    let tier = LayoutTier::from_node_count(dataset.node_count());
    let reduction = EdgeReducer::new(reducer).reduce(&mut dataset, tier, seed);
    Staged {
        dataset,
        assembly,
        reduction,
    }
}

/// Run the full pipeline on the current thread.
pub fn prepare_render_graph(nodes: Vec<Node>, edges: Vec<Edge>, seed: u64, options: &RenderOptions) -> RenderGraph {
    let staged = stage(nodes, edges, seed, options.reducer);
    let mut engine = LayoutEngine::new(&staged.dataset, &options.layout);
    let report = run_blocking(&mut engine);
    finish(staged, &engine, report, options.color_mode)
}

/// Run the pipeline with layout in cooperative slices. `None` if `cancel`
/// fired before the layout finished.
pub async fn prepare_render_graph_cooperative(
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    seed: u64,
    options: &RenderOptions,
    cancel: &CancelToken,
) -> Option<RenderGraph> {
    let staged = stage(nodes, edges, seed, options.reducer);
    let mut engine = LayoutEngine::new(&staged.dataset, &options.layout);
    let slice = Duration::from_millis(options.layout.slice_ms.max(1));
    let report = run_cooperative(&mut engine, slice, Some(cancel)).await;
    if cancel.is_cancelled() && report.state != LayoutState::Relaxed {
        return None;
    }
    Some(finish(staged, &engine, report, options.color_mode))
}

fn finish(staged: Staged, engine: &LayoutEngine, report: LayoutReport, mode: NodeColorMode) -> RenderGraph {
    let Staged {
        dataset,
        assembly,
        reduction,
    } = staged;
    let (nodes, edges) = encode(&dataset, engine, mode);
    info!(
        tier = %report.tier,
        nodes = nodes.len(),
        edges = edges.len(),
        iterations = report.iterations,
        elapsed_ms = report.elapsed_ms,
        "render graph prepared"
    );
    RenderGraph {
        tier: report.tier,
        color_mode: mode,
        nodes,
        edges,
        assembly,
        reduction,
        layout: report,
    }
}

/// Apply the encoding functions to a laid-out dataset.
pub fn encode(dataset: &GraphDataset, engine: &LayoutEngine, mode: NodeColorMode) -> (Vec<RenderNode>, Vec<RenderEdge>) {
    let tier = engine.tier();
    let scales = DepthScales::fit(dataset);
    let nodes = dataset
        .nodes
        .iter()
        .map(|node| {
            let position = engine.position(node.id).unwrap_or_default();
            let (border_size, border_color) = node_border(node);
            RenderNode {
                id: node.id,
                slug: node.slug.clone(),
                x: position.x,
                y: position.y,
                size: node_size(node, tier),
                color: node_color(node, mode, &scales),
                border_size,
                border_color: border_color.to_string(),
                depth: node.depth,
                played: node.played,
                occurrences: node.occurrences,
            }
        })
        .collect();

    let by_id: HashMap<NodeId, &Node> = dataset.nodes.iter().map(|n| (n.id, n)).collect();
    let edges = dataset
        .edges
        .iter()
        .filter_map(|e| {
            let depth = edge_depth(by_id.get(&e.from)?, by_id.get(&e.to)?);
            Some(RenderEdge {
                from: e.from,
                to: e.to,
                color: edge_color(depth),
                size: edge_width(depth),
            })
        })
        .collect();
    (nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{NEVER_OCCURRED_COLOR, ROOT_COLOR, ROOT_SIZE};

    fn node(id: NodeId, depth: u32, occurrences: u64) -> Node {
        Node {
            id,
            slug: format!("{}-{}", depth, id),
            depth,
            played: occurrences > 0,
            occurrences,
            norm: occurrences as f64 / 10.0,
        }
    }

    fn options() -> RenderOptions {
        RenderOptions {
            layout: LayoutOptions {
                max_iterations: Some(10),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn pipeline_encodes_every_surviving_node() {
        let nodes = vec![Node::root(), node(1, 1, 10), node(2, 1, 4), node(3, 2, 0), node(1, 1, 99)];
        let edges = vec![Edge::new(0, 1), Edge::new(0, 2), Edge::new(1, 3), Edge::new(1, 3), Edge::new(3, 42)];

        let graph = prepare_render_graph(nodes, edges, 1, &options());
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.assembly.duplicate_nodes, 1);
        assert_eq!(graph.assembly.duplicate_edges, 1);
        assert_eq!(graph.assembly.orphan_edges, 1);
        assert!(!graph.reduction.active);
        assert_eq!(graph.layout.state, LayoutState::Relaxed);

        let root = graph.node(0).unwrap();
        assert_eq!((root.x, root.y), (0.0, 0.0));
        assert_eq!(root.size, ROOT_SIZE);
        assert_eq!(root.color, ROOT_COLOR);
        assert_eq!(root.border_size, 3.0);

        let unplayed = graph.node(3).unwrap();
        assert_eq!(unplayed.color, NEVER_OCCURRED_COLOR);
        assert!(graph.nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));

        let deep_edge = graph.edges.iter().find(|e| e.from == 1 && e.to == 3).unwrap();
        assert_eq!(deep_edge.size, edge_width(2));
    }

    #[test]
    fn relaxation_can_be_disabled() {
        let nodes = vec![Node::root(), node(1, 1, 3), node(2, 1, 5)];
        let edges = vec![Edge::new(0, 1), Edge::new(0, 2)];
        let mut opts = options();
        opts.layout.relax = false;

        let graph = prepare_render_graph(nodes, edges, 0, &opts);
        assert_eq!(graph.layout.iterations, 0);
        let a = graph.node(1).unwrap();
        let radius = (a.x * a.x + a.y * a.y).sqrt();
        assert!((radius - 120.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cancelled_cooperative_run_yields_nothing() {
        let nodes: Vec<Node> = std::iter::once(Node::root())
            .chain((1..200).map(|id| node(id, 1 + id % 4, id as u64)))
            .collect();
        let edges = (1..200).map(|id| Edge::new(0, id)).collect();
        let token = CancelToken::new();
        token.cancel();

        let mut opts = options();
        opts.layout.max_iterations = Some(500);
        let out = prepare_render_graph_cooperative(nodes, edges, 0, &opts, &token).await;
        assert!(out.is_none());
    }
}
