//! Performance tiers.
//!
//! Every size-dependent tunable of the reducer, layout and encoding passes
//! is read from [`TierParams::for_tier`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Node-count band. Ordered from smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutTier {
    Small,
    Large,
    Extreme,
    Massive,
}

impl LayoutTier {
    pub const LARGE_FROM: usize = 5_000;
    pub const EXTREME_FROM: usize = 20_000;
    pub const MASSIVE_FROM: usize = 50_000;

    pub fn from_node_count(nodes: usize) -> Self {
        if nodes >= Self::MASSIVE_FROM {
            LayoutTier::Massive
        } else if nodes >= Self::EXTREME_FROM {
            LayoutTier::Extreme
        } else if nodes >= Self::LARGE_FROM {
            LayoutTier::Large
        } else {
            LayoutTier::Small
        }
    }

    pub fn is_top(&self) -> bool {
        *self == LayoutTier::Massive
    }

    pub fn params(&self) -> TierParams {
        TierParams::for_tier(*self)
    }
}

impl std::fmt::Display for LayoutTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LayoutTier::Small => "small",
            LayoutTier::Large => "large",
            LayoutTier::Extreme => "extreme",
            LayoutTier::Massive => "massive",
        };
        f.write_str(s)
    }
}

/// Tier-indexed layout and encoding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierParams {
    pub tier: LayoutTier,
    /// Ring spacing of the radial seed.
    pub radius_step: f64,
    /// Whether force relaxation runs at all.
    pub relax: bool,
    /// Node-iterations of work the relaxation may spend.
    pub iteration_work: usize,
    pub min_iterations: usize,
    pub max_iterations: usize,
    /// Wall-clock cutoff for relaxation.
    pub time_budget: Duration,
    pub gravity: f64,
    pub scaling_ratio: f64,
    pub slow_down: f64,
    /// Barnes–Hut opening angle; larger is coarser and faster.
    pub barnes_hut_theta: f64,
    /// Divide attraction by source degree.
    pub outbound_attraction_distribution: bool,
    /// Floor for non-root node sizes.
    pub min_node_size: f64,
}

impl TierParams {
    pub fn for_tier(tier: LayoutTier) -> Self {
        let base = TierParams {
            tier,
            radius_step: 120.0,
            relax: true,
            iteration_work: 2_000_000,
            min_iterations: 50,
            max_iterations: 500,
            time_budget: Duration::from_millis(5_000),
            gravity: 0.05,
            scaling_ratio: 10.0,
            slow_down: 10.0,
            barnes_hut_theta: 0.5,
            outbound_attraction_distribution: true,
            min_node_size: 5.0,
        };

        match tier {
            LayoutTier::Small => base,
            LayoutTier::Large => TierParams {
                iteration_work: 3_000_000,
                min_iterations: 30,
                max_iterations: 200,
                time_budget: Duration::from_millis(2_000),
                barnes_hut_theta: 0.8,
                ..base
            },
            LayoutTier::Extreme => TierParams {
                iteration_work: 2_500_000,
                min_iterations: 10,
                max_iterations: 60,
                time_budget: Duration::from_millis(500),
                barnes_hut_theta: 1.2,
                min_node_size: 6.0,
                ..base
            },
            LayoutTier::Massive => TierParams {
                relax: false,
                iteration_work: 0,
                min_iterations: 0,
                max_iterations: 0,
                time_budget: Duration::ZERO,
                barnes_hut_theta: 1.5,
                min_node_size: 7.0,
                ..base
            },
        }
    }

    /// Relaxation iterations for a graph of `nodes` nodes.
    pub fn iteration_budget(&self, nodes: usize) -> usize {
        if !self.relax {
            return 0;
        }
        (self.iteration_work / nodes.max(1)).clamp(self.min_iterations, self.max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(LayoutTier::from_node_count(0), LayoutTier::Small);
        assert_eq!(LayoutTier::from_node_count(4_999), LayoutTier::Small);
        assert_eq!(LayoutTier::from_node_count(5_000), LayoutTier::Large);
        assert_eq!(LayoutTier::from_node_count(19_999), LayoutTier::Large);
        assert_eq!(LayoutTier::from_node_count(20_000), LayoutTier::Extreme);
        assert_eq!(LayoutTier::from_node_count(50_000), LayoutTier::Massive);
        assert_eq!(LayoutTier::from_node_count(125_000), LayoutTier::Massive);
    }

    #[test]
    fn budgets_shrink_as_tiers_grow() {
        let tiers = [
            LayoutTier::Small,
            LayoutTier::Large,
            LayoutTier::Extreme,
            LayoutTier::Massive,
        ];
        for pair in tiers.windows(2) {
            let (a, b) = (pair[0].params(), pair[1].params());
            assert!(a.time_budget > b.time_budget);
            assert!(a.max_iterations > b.max_iterations);
            assert!(a.min_node_size <= b.min_node_size);
        }
        assert_eq!(LayoutTier::Extreme.params().time_budget, Duration::from_millis(500));
    }

    #[test]
    fn massive_tier_never_relaxes() {
        let p = LayoutTier::Massive.params();
        assert!(!p.relax);
        assert_eq!(p.iteration_budget(80_000), 0);
    }

    #[test]
    fn iteration_budget_scales_with_node_count() {
        let p = LayoutTier::Small.params();
        assert_eq!(p.iteration_budget(100), p.max_iterations);
        assert!(p.iteration_budget(4_999) < p.max_iterations);
        assert!(p.iteration_budget(4_999) >= p.min_iterations);
    }
}
