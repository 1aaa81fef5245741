//! Edge reduction for the largest graphs.
//!
//! Runs only when the edge count is above the ceiling and the node count is
//! in the top tier. Structural, discovery and popular edges are always kept;
//! the rest are sampled at a fixed rate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scorigami_core::tier::LayoutTier;
use scorigami_core::types::{GraphDataset, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Reducer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReducerConfig {
    #[serde(default = "default_edge_ceiling")]
    pub edge_ceiling: usize,
    /// Edges with both endpoints at depth <= this are structural.
    #[serde(default = "default_structural_depth")]
    pub structural_depth: u32,
    #[serde(default = "default_popular_threshold")]
    pub popular_threshold: u64,
    /// Keep probability for the remaining edges.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    /// Seed the sampler from the filter key instead of entropy.
    #[serde(default = "default_seeded")]
    pub seeded: bool,
}

fn default_edge_ceiling() -> usize {
    50_000
}

fn default_structural_depth() -> u32 {
    2
}

fn default_popular_threshold() -> u64 {
    100
}

fn default_sample_rate() -> f64 {
    0.10
}

fn default_seeded() -> bool {
    true
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            edge_ceiling: default_edge_ceiling(),
            structural_depth: default_structural_depth(),
            popular_threshold: default_popular_threshold(),
            sample_rate: default_sample_rate(),
            seeded: default_seeded(),
        }
    }
}

/// Why edges were kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionReport {
    pub active: bool,
    pub input_edges: usize,
    pub structural: usize,
    pub discovery: usize,
    pub popular: usize,
    pub sampled: usize,
    pub dropped: usize,
}

impl ReductionReport {
    pub fn kept(&self) -> usize {
        self.structural + self.discovery + self.popular + self.sampled
    }
}

enum Retain {
    Structural,
    Discovery,
    Popular,
    Sample,
}

/// Edge reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeReducer {
    config: ReducerConfig,
}

impl EdgeReducer {
    pub fn new(config: ReducerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Whether a graph of this size would be reduced.
    pub fn applies(&self, tier: LayoutTier, edges: usize) -> bool {
        tier.is_top() && edges > self.config.edge_ceiling
    }

    /// Reduce `dataset.edges` in place. `seed` is used when the config asks
    /// for seeded sampling; otherwise the sampler draws from entropy.
    pub fn reduce(&self, dataset: &mut GraphDataset, tier: LayoutTier, seed: u64) -> ReductionReport {
        let mut report = ReductionReport {
            input_edges: dataset.edge_count(),
            ..Default::default()
        };
        if !self.applies(tier, dataset.edge_count()) {
            return report;
        }
        report.active = true;

        let mut rng = if self.config.seeded {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };
        let rate = self.config.sample_rate.clamp(0.0, 1.0);
        let by_id: HashMap<NodeId, &Node> = dataset.nodes.iter().map(|n| (n.id, n)).collect();

        let edges = std::mem::take(&mut dataset.edges);
        let mut kept = Vec::with_capacity(edges.len() / 4);
        for edge in edges {
            let (Some(from), Some(to)) = (by_id.get(&edge.from), by_id.get(&edge.to)) else {
                report.dropped += 1;
                continue;
            };
            match self.classify(from, to) {
                Retain::Structural => report.structural += 1,
                Retain::Discovery => report.discovery += 1,
                Retain::Popular => report.popular += 1,
                Retain::Sample => {
                    if !rng.gen_bool(rate) {
                        report.dropped += 1;
                        continue;
                    }
                    report.sampled += 1;
                }
            }
            kept.push(edge);
        }
        dataset.edges = kept;

        info!(
            %tier,
            input = report.input_edges,
            kept = report.kept(),
            structural = report.structural,
            discovery = report.discovery,
            popular = report.popular,
            sampled = report.sampled,
            "edges reduced"
        );
        report
    }

    fn classify(&self, from: &Node, to: &Node) -> Retain {
        let c = &self.config;
        if from.depth <= c.structural_depth && to.depth <= c.structural_depth {
            Retain::Structural
        } else if is_discovery(from) || is_discovery(to) {
            Retain::Discovery
        } else if from.occurrences > c.popular_threshold || to.occurrences > c.popular_threshold {
            Retain::Popular
        } else {
            Retain::Sample
        }
    }
}

fn is_discovery(node: &Node) -> bool {
    !node.played || node.occurrences == 0
}
