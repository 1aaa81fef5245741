//! Layout engine.
//!
//! `Unlaid → RadialSeeded → Relaxed`. Seeding puts the root at the origin
//! and every depth on its own ring; relaxation is a ForceAtlas2-style pass
//! (linear attraction along edges, degree-weighted Barnes–Hut repulsion,
//! gravity toward the origin, per-node adaptive speed). All numbers come
//! from the tier's [`TierParams`]. Work is done in deadline-bounded slices
//! through [`LayoutEngine::step`]; see [`crate::scheduler`] for drivers.

use crate::quadtree::QuadTree;
use scorigami_core::tier::{LayoutTier, TierParams};
use scorigami_core::types::{GraphDataset, NodeId, Position};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::TAU;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Layout state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutState {
    Unlaid,
    RadialSeeded,
    Relaxed,
}

/// Result of one [`LayoutEngine::step`] slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Deadline reached with work left.
    Pending,
    /// Positions are final.
    Done,
}

/// User overrides on top of the tier table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Allow relaxation at all. Tiers that forbid it are not overridden.
    #[serde(default = "default_relax")]
    pub relax: bool,
    /// Replace the tier's wall-clock budget.
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
    /// Replace the node-count-scaled iteration budget.
    #[serde(default)]
    pub max_iterations: Option<usize>,
    /// Slice length for cooperative scheduling.
    #[serde(default = "default_slice_ms")]
    pub slice_ms: u64,
}

fn default_relax() -> bool {
    true
}

fn default_slice_ms() -> u64 {
    16
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            relax: default_relax(),
            time_budget_ms: None,
            max_iterations: None,
            slice_ms: default_slice_ms(),
        }
    }
}

/// Summary of a finished (or interrupted) layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutReport {
    pub tier: LayoutTier,
    pub state: LayoutState,
    pub nodes: usize,
    pub iterations: usize,
    pub iteration_budget: usize,
    pub elapsed_ms: u64,
    /// Relaxation stopped on the wall-clock budget rather than iterations.
    pub deadline_hit: bool,
}

/// Positions for one dataset.
pub struct LayoutEngine {
    params: TierParams,
    state: LayoutState,
    ids: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    /// `(depth, node indices ordered by (slug, id))`.
    rings: Vec<(u32, Vec<usize>)>,
    edges: Vec<(usize, usize)>,
    masses: Vec<f64>,
    pinned: Vec<bool>,
    positions: Vec<Position>,
    forces: Vec<(f64, f64)>,
    old_forces: Vec<(f64, f64)>,
    outbound_compensation: f64,
    iteration_budget: usize,
    time_budget: Duration,
    iterations: usize,
    relax_elapsed: Duration,
    deadline_hit: bool,
}

impl LayoutEngine {
    /// Engine for `dataset` using its node-count tier.
    pub fn new(dataset: &GraphDataset, options: &LayoutOptions) -> Self {
        let tier = LayoutTier::from_node_count(dataset.node_count());
        let mut params = TierParams::for_tier(tier);
        if !options.relax {
            params.relax = false;
        }
        let mut engine = Self::with_params(dataset, params);
        if let Some(ms) = options.time_budget_ms {
            engine.time_budget = Duration::from_millis(ms);
        }
        if let Some(max) = options.max_iterations {
            if engine.params.relax {
                engine.iteration_budget = max;
            }
        }
        engine
    }

    /// Engine with an explicit parameter set.
    pub fn with_params(dataset: &GraphDataset, params: TierParams) -> Self {
        let n = dataset.node_count();
        let ids: Vec<NodeId> = dataset.nodes.iter().map(|n| n.id).collect();
        let index: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut by_depth: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, node) in dataset.nodes.iter().enumerate() {
            by_depth.entry(node.depth).or_default().push(i);
        }
        let rings = by_depth
            .into_iter()
            .map(|(depth, mut members)| {
                members.sort_by(|a, b| {
                    let (na, nb) = (&dataset.nodes[*a], &dataset.nodes[*b]);
                    na.slug.cmp(&nb.slug).then(na.id.cmp(&nb.id))
                });
                (depth, members)
            })
            .collect();

        let mut degree = vec![0usize; n];
        let edges: Vec<(usize, usize)> = dataset
            .edges
            .iter()
            .filter_map(|e| Some((*index.get(&e.from)?, *index.get(&e.to)?)))
            .filter(|(s, t)| s != t)
            .collect();
        for (s, t) in &edges {
            degree[*s] += 1;
            degree[*t] += 1;
        }
        let masses: Vec<f64> = degree.iter().map(|d| 1.0 + *d as f64).collect();
        let outbound_compensation = if n == 0 {
            1.0
        } else {
            masses.iter().sum::<f64>() / n as f64
        };
        let pinned = dataset.nodes.iter().map(|node| node.depth == 0).collect();

        Self {
            iteration_budget: params.iteration_budget(n),
            time_budget: params.time_budget,
            params,
            state: LayoutState::Unlaid,
            ids,
            index,
            rings,
            edges,
            masses,
            pinned,
            positions: vec![Position::origin(); n],
            forces: vec![(0.0, 0.0); n],
            old_forces: vec![(0.0, 0.0); n],
            outbound_compensation,
            iterations: 0,
            relax_elapsed: Duration::ZERO,
            deadline_hit: false,
        }
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    pub fn tier(&self) -> LayoutTier {
        self.params.tier
    }

    pub fn params(&self) -> &TierParams {
        &self.params
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Effective wall-clock budget for relaxation.
    pub fn time_budget(&self) -> Duration {
        self.time_budget
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.index.get(&id).map(|i| self.positions[*i])
    }

    /// `(id, position)` in dataset order.
    pub fn positions(&self) -> impl Iterator<Item = (NodeId, Position)> + '_ {
        self.ids.iter().copied().zip(self.positions.iter().copied())
    }

    pub fn position_map(&self) -> HashMap<NodeId, Position> {
        self.positions().collect()
    }

    pub fn report(&self) -> LayoutReport {
        LayoutReport {
            tier: self.params.tier,
            state: self.state,
            nodes: self.ids.len(),
            iterations: self.iterations,
            iteration_budget: self.iteration_budget,
            elapsed_ms: self.relax_elapsed.as_millis() as u64,
            deadline_hit: self.deadline_hit,
        }
    }

    /// Place every node on its depth ring. No-op unless `Unlaid`.
    pub fn seed_radial(&mut self) {
        if self.state != LayoutState::Unlaid {
            return;
        }
        for (depth, members) in &self.rings {
            if *depth == 0 {
                for i in members {
                    self.positions[*i] = Position::origin();
                }
                continue;
            }
            let radius = f64::from(*depth) * self.params.radius_step;
            let count = members.len() as f64;
            for (k, i) in members.iter().enumerate() {
                let angle = TAU * k as f64 / count;
                self.positions[*i] = Position::new(radius * angle.cos(), radius * angle.sin());
            }
        }
        self.state = LayoutState::RadialSeeded;
        debug!(tier = %self.params.tier, rings = self.rings.len(), "radial seed placed");
    }

    /// Run relaxation until `deadline`, the iteration budget, or the
    /// wall-clock budget, whichever comes first. Seeds first if needed.
    /// At least one iteration runs per call while work remains.
    pub fn step(&mut self, deadline: Instant) -> StepOutcome {
        match self.state {
            LayoutState::Relaxed => return StepOutcome::Done,
            LayoutState::Unlaid => self.seed_radial(),
            LayoutState::RadialSeeded => {}
        }
        if !self.params.relax || self.iteration_budget == 0 || self.ids.len() < 2 {
            self.finish();
            return StepOutcome::Done;
        }

        let started = Instant::now();
        loop {
            let spent = self.relax_elapsed + started.elapsed();
            if self.iterations >= self.iteration_budget {
                self.relax_elapsed = spent;
                self.finish();
                return StepOutcome::Done;
            }
            if spent >= self.time_budget {
                self.relax_elapsed = spent;
                self.deadline_hit = true;
                self.finish();
                return StepOutcome::Done;
            }

            self.iterate();
            self.iterations += 1;

            if Instant::now() >= deadline {
                self.relax_elapsed += started.elapsed();
                return StepOutcome::Pending;
            }
        }
    }

    fn finish(&mut self) {
        self.state = LayoutState::Relaxed;
        info!(
            tier = %self.params.tier,
            nodes = self.ids.len(),
            iterations = self.iterations,
            budget = self.iteration_budget,
            elapsed_ms = self.relax_elapsed.as_millis() as u64,
            deadline_hit = self.deadline_hit,
            "layout settled"
        );
    }

    fn iterate(&mut self) {
        let p = &self.params;
        let n = self.positions.len();

        for f in self.forces.iter_mut() {
            *f = (0.0, 0.0);
        }

        let tree = QuadTree::build(&self.positions, &self.masses);
        for i in 0..n {
            if self.pinned[i] {
                continue;
            }
            let pos = self.positions[i];
            let m = self.masses[i];
            let (fx, fy) = tree.repulsion(
                i,
                &pos,
                m,
                p.barnes_hut_theta,
                p.scaling_ratio,
                &self.positions,
                &self.masses,
            );

            let mut gx = 0.0;
            let mut gy = 0.0;
            let dist = (pos.x * pos.x + pos.y * pos.y).sqrt();
            if dist > 0.0 {
                let factor = p.gravity * m / dist;
                gx = -pos.x * factor;
                gy = -pos.y * factor;
            }
            self.forces[i] = (fx + gx, fy + gy);
        }

        for (s, t) in &self.edges {
            let (ps, pt) = (self.positions[*s], self.positions[*t]);
            let coefficient = if p.outbound_attraction_distribution {
                self.outbound_compensation / self.masses[*s]
            } else {
                1.0
            };
            let dx = (ps.x - pt.x) * coefficient;
            let dy = (ps.y - pt.y) * coefficient;
            self.forces[*s].0 -= dx;
            self.forces[*s].1 -= dy;
            self.forces[*t].0 += dx;
            self.forces[*t].1 += dy;
        }

        for i in 0..n {
            if self.pinned[i] {
                continue;
            }
            let (fx, fy) = self.forces[i];
            let (ox, oy) = self.old_forces[i];
            let swinging = self.masses[i] * ((ox - fx).powi(2) + (oy - fy).powi(2)).sqrt();
            let traction = ((ox + fx).powi(2) + (oy + fy).powi(2)).sqrt() / 2.0;
            let speed = 0.1 * (1.0 + traction).ln() / (1.0 + swinging.sqrt());

            let next = Position::new(
                self.positions[i].x + fx * speed / p.slow_down,
                self.positions[i].y + fy * speed / p.slow_down,
            );
            if next.is_finite() {
                self.positions[i] = next;
            }
            self.old_forces[i] = (fx, fy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorigami_core::types::{Edge, Node};

    fn node(id: NodeId, slug: &str, depth: u32) -> Node {
        Node {
            id,
            slug: slug.to_string(),
            depth,
            played: true,
            occurrences: 1,
            norm: 0.0,
        }
    }

    fn tree(width: u32) -> GraphDataset {
        let mut nodes = vec![Node::root()];
        let mut edges = Vec::new();
        let mut next = 1;
        for a in 0..width {
            let parent = next;
            nodes.push(node(parent, &format!("{}-6", a), 1));
            edges.push(Edge::new(0, parent));
            next += 1;
            for b in 0..width {
                nodes.push(node(next, &format!("{}-6 {}-6", a, b), 2));
                edges.push(Edge::new(parent, next));
                next += 1;
            }
        }
        GraphDataset::new(nodes, edges)
    }

    fn fixed(iterations: usize) -> LayoutOptions {
        LayoutOptions {
            time_budget_ms: Some(60_000),
            max_iterations: Some(iterations),
            ..Default::default()
        }
    }

    #[test]
    fn radial_seed_places_rings() {
        let ds = tree(4);
        let mut engine = LayoutEngine::new(&ds, &LayoutOptions::default());
        assert_eq!(engine.state(), LayoutState::Unlaid);
        engine.seed_radial();
        assert_eq!(engine.state(), LayoutState::RadialSeeded);

        assert_eq!(engine.position(0), Some(Position::origin()));
        for n in &ds.nodes {
            let r = engine.position(n.id).unwrap().distance_to(&Position::origin());
            assert!((r - f64::from(n.depth) * 120.0).abs() < 1e-9, "node {}", n.id);
        }
        // first slug in sort order sits at angle zero
        let first = engine.position(1).unwrap();
        assert!((first.x - 120.0).abs() < 1e-9 && first.y.abs() < 1e-9);
    }

    #[test]
    fn seed_order_ignores_input_order() {
        let ds = tree(3);
        let mut reversed = ds.clone();
        reversed.nodes.reverse();

        let mut a = LayoutEngine::new(&ds, &LayoutOptions::default());
        let mut b = LayoutEngine::new(&reversed, &LayoutOptions::default());
        a.seed_radial();
        b.seed_radial();
        for n in &ds.nodes {
            assert_eq!(a.position(n.id), b.position(n.id));
        }
    }

    #[test]
    fn relaxation_is_repeatable_and_finite() {
        let ds = tree(6);
        let mut a = LayoutEngine::new(&ds, &fixed(25));
        let mut b = LayoutEngine::new(&ds, &fixed(25));
        let far = Instant::now() + Duration::from_secs(60);
        assert_eq!(a.step(far), StepOutcome::Done);
        assert_eq!(b.step(far), StepOutcome::Done);

        assert_eq!(a.state(), LayoutState::Relaxed);
        assert_eq!(a.iterations(), 25);
        for (id, pos) in a.positions() {
            assert!(pos.is_finite());
            assert_eq!(Some(pos), b.position(id));
        }
        assert_eq!(a.position(0), Some(Position::origin()));
    }

    #[test]
    fn relaxed_positions_are_frozen() {
        let ds = tree(3);
        let mut engine = LayoutEngine::new(&ds, &fixed(5));
        engine.step(Instant::now() + Duration::from_secs(10));
        let before = engine.position_map();
        assert_eq!(engine.step(Instant::now() + Duration::from_secs(10)), StepOutcome::Done);
        engine.seed_radial();
        assert_eq!(engine.position_map(), before);
    }

    #[test]
    fn top_tier_skips_relaxation() {
        let ds = tree(3);
        let mut engine = LayoutEngine::with_params(&ds, TierParams::for_tier(LayoutTier::Massive));
        assert_eq!(engine.step(Instant::now()), StepOutcome::Done);
        assert_eq!(engine.iterations(), 0);
        assert_eq!(engine.state(), LayoutState::Relaxed);
        // still radially seeded
        assert!((engine.position(1).unwrap().distance_to(&Position::origin()) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn wall_clock_budget_stops_relaxation() {
        let ds = tree(40);
        let mut engine = LayoutEngine::new(
            &ds,
            &LayoutOptions {
                time_budget_ms: Some(1),
                max_iterations: Some(1_000_000),
                ..Default::default()
            },
        );
        let started = Instant::now();
        while engine.step(Instant::now() + Duration::from_millis(5)) == StepOutcome::Pending {}
        assert!(engine.report().deadline_hit);
        assert!(engine.iterations() < 1_000_000);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn short_deadline_yields_pending() {
        let ds = tree(10);
        let mut engine = LayoutEngine::new(&ds, &fixed(1_000));
        assert_eq!(engine.step(Instant::now()), StepOutcome::Pending);
        assert_eq!(engine.iterations(), 1);
        assert_eq!(engine.state(), LayoutState::RadialSeeded);
    }
}
