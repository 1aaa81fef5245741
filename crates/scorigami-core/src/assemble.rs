//! Graph assembly: decoded node and edge lists into one consistent
//! [`GraphDataset`].
//!
//! Assembly never fails. Repeated node ids keep their first occurrence,
//! repeated `(from, to)` pairs keep their first occurrence, and edges with an
//! endpoint outside the node set are dropped. Input order is otherwise
//! preserved, so assembling an assembled dataset returns it unchanged.

use crate::error::AggregationFailure;
use crate::types::{Edge, GraphDataset, Node, NodeId};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What assembly discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub duplicate_nodes: usize,
    pub duplicate_edges: usize,
    pub orphan_edges: usize,
}

impl AssemblyReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_nodes == 0 && self.duplicate_edges == 0 && self.orphan_edges == 0
    }
}

/// Assemble a dataset, discarding the report.
pub fn assemble(nodes: Vec<Node>, edges: Vec<Edge>) -> GraphDataset {
    assemble_with_report(nodes, edges).0
}

/// Assemble a dataset and report what was dropped.
pub fn assemble_with_report(nodes: Vec<Node>, edges: Vec<Edge>) -> (GraphDataset, AssemblyReport) {
    let mut report = AssemblyReport::default();
    let mut graph: DiGraphMap<NodeId, ()> =
        DiGraphMap::with_capacity(nodes.len(), edges.len());

    let mut kept_nodes = Vec::with_capacity(nodes.len());
    for node in nodes {
        if graph.contains_node(node.id) {
            report.duplicate_nodes += 1;
            continue;
        }
        graph.add_node(node.id);
        kept_nodes.push(node);
    }

    let mut kept_edges = Vec::with_capacity(edges.len());
    for edge in edges {
        if !graph.contains_node(edge.from) || !graph.contains_node(edge.to) {
            report.orphan_edges += 1;
            continue;
        }
        if graph.contains_edge(edge.from, edge.to) {
            report.duplicate_edges += 1;
            continue;
        }
        graph.add_edge(edge.from, edge.to, ());
        kept_edges.push(edge);
    }

    (GraphDataset::new(kept_nodes, kept_edges), report)
}

/// Reject self-loops and directed cycles.
///
/// Edges whose endpoints are not listed in `nodes` are ignored, matching
/// what assembly would do with them.
pub fn check_acyclic(nodes: &[Node], edges: &[Edge]) -> Result<(), AggregationFailure> {
    let ids: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
    let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::with_capacity(ids.len(), edges.len());
    for id in &ids {
        graph.add_node(*id);
    }
    for edge in edges {
        if !ids.contains(&edge.from) || !ids.contains(&edge.to) {
            continue;
        }
        if edge.from == edge.to {
            return Err(AggregationFailure::SelfLoop(edge.from));
        }
        graph.add_edge(edge.from, edge.to, ());
    }

    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| AggregationFailure::Cycle(cycle.node_id()))
}
