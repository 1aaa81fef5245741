//! Shared types used across the scorigami crates.

use serde::{Deserialize, Serialize};

/// Identifier of a score sequence.
pub type NodeId = u32;

/// Id of the synthetic root node.
pub const ROOT_ID: NodeId = 0;

/// Slug of the synthetic root node.
pub const ROOT_SLUG: &str = "love-all";

/// A score sequence in the graph.
///
/// `slug` is the human-readable sequence (e.g. `"6-4 3-6"`), `depth` the
/// number of completed sets it represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub slug: String,
    pub depth: u32,
    pub played: bool,
    pub occurrences: u64,
    /// `occurrences / max(occurrences in this dataset, 1)`.
    #[serde(default)]
    pub norm: f64,
}

impl Node {
    /// The canonical `love-all` root.
    pub fn root() -> Self {
        Self {
            id: ROOT_ID,
            slug: ROOT_SLUG.to_string(),
            depth: 0,
            played: false,
            occurrences: 0,
            norm: 0.0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID && self.depth == 0
    }

    /// A sequence that has never been recorded in match history.
    pub fn is_scorigami(&self) -> bool {
        !self.played || self.occurrences == 0
    }
}

/// A directed parent → child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    #[serde(alias = "frm")]
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

/// One consistent node/edge set for a single filter selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDataset {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphDataset {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deepest depth present, 0 for an empty dataset.
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Number of non-root nodes that were never played.
    pub fn scorigami_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| !n.is_root() && n.is_scorigami())
            .count()
    }
}

/// A position in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
