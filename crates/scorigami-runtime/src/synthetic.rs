//! Seeded synthetic match history.
//!
//! Builds a [`MemoryStore`] that looks like the real aggregates: every
//! score sequence up to `enumerate_depth` sets exists as a node (most of
//! the deep ones never played), and simulated matches add the played
//! paths with per-event detail rows. Used for demos, the CLI `seed`
//! command and tests.

use crate::store::{DetailEdgeRow, DetailNodeRow, EdgeRow, EventMeta, MemoryStore, NodeRow};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scorigami_core::filter::{AggregateView, Sets};
use scorigami_core::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

/// Every set score a completed set can end on, first player first.
pub const POSSIBLE_SCORES: [(u8, u8); 14] = [
    (6, 0),
    (6, 1),
    (6, 2),
    (6, 3),
    (6, 4),
    (7, 5),
    (7, 6),
    (6, 7),
    (5, 7),
    (4, 6),
    (3, 6),
    (2, 6),
    (1, 6),
    (0, 6),
];

/// Relative frequency of winning set scores, `6-0` through `7-6`.
const WIN_WEIGHTS: [u32; 7] = [1, 3, 5, 6, 6, 3, 4];

/// Generator settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Simulated matches per (format, sex) pair.
    #[serde(default = "default_matches")]
    pub matches: usize,
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    #[serde(default = "default_last_year")]
    pub last_year: i32,
    /// Tournaments per year, numbered from 1.
    #[serde(default = "default_tournaments")]
    pub tournaments: u32,
    /// Every sequence up to this many sets becomes a node, played or not.
    #[serde(default = "default_enumerate_depth")]
    pub enumerate_depth: u32,
}

fn default_seed() -> u64 {
    7
}

fn default_matches() -> usize {
    2_000
}

fn default_first_year() -> i32 {
    2015
}

fn default_last_year() -> i32 {
    2019
}

fn default_tournaments() -> u32 {
    4
}

fn default_enumerate_depth() -> u32 {
    3
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            matches: default_matches(),
            first_year: default_first_year(),
            last_year: default_last_year(),
            tournaments: default_tournaments(),
            enumerate_depth: default_enumerate_depth(),
        }
    }
}

/// Sets needed to win a match of this format.
pub fn sets_to_win(format: Sets) -> usize {
    usize::from(format.as_u8() / 2 + 1)
}

/// Whether either player has won the match.
pub fn is_match_complete(sets: &[(u8, u8)], format: Sets) -> bool {
    let first = sets.iter().filter(|(a, b)| a > b).count();
    let second = sets.len() - first;
    let needed = sets_to_win(format);
    first >= needed || second >= needed
}

/// `"6-4 3-6"` style slug.
pub fn slug(sets: &[(u8, u8)]) -> String {
    sets.iter()
        .map(|(a, b)| format!("{}-{}", a, b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Default)]
struct Interner {
    ids: HashMap<String, NodeId>,
    next: NodeId,
}

impl Interner {
    fn id(&mut self, slug: &str) -> NodeId {
        if let Some(id) = self.ids.get(slug) {
            return *id;
        }
        self.next += 1;
        self.ids.insert(slug.to_string(), self.next);
        self.next
    }
}

#[derive(Default)]
struct Tally {
    nodes: BTreeMap<NodeId, (String, u32, u64)>,
    edges: BTreeSet<(NodeId, NodeId)>,
    detail_nodes: BTreeMap<(i64, NodeId), u64>,
    detail_edges: BTreeSet<(i64, NodeId, NodeId)>,
}

impl Tally {
    fn enumerate(&mut self, format: Sets, max_depth: u32, ids: &mut Interner) {
        let mut prefix = Vec::new();
        self.enumerate_from(&mut prefix, format, max_depth as usize, ids);
    }

    fn enumerate_from(&mut self, prefix: &mut Vec<(u8, u8)>, format: Sets, max_depth: usize, ids: &mut Interner) {
        if prefix.len() >= max_depth || is_match_complete(prefix, format) {
            return;
        }
        for score in POSSIBLE_SCORES {
            prefix.push(score);
            self.touch(prefix, ids, 0, None);
            self.enumerate_from(prefix, format, max_depth, ids);
            prefix.pop();
        }
    }

    fn record(&mut self, sets: &[(u8, u8)], event_id: i64, ids: &mut Interner) {
        for k in 1..=sets.len() {
            self.touch(&sets[..k], ids, 1, Some(event_id));
        }
    }

    /// Register the node for `prefix` and its parent edge, adding `count`
    /// occurrences (and detail rows when attributed to an event).
    fn touch(&mut self, prefix: &[(u8, u8)], ids: &mut Interner, count: u64, event: Option<i64>) {
        let id = ids.id(&slug(prefix));
        let depth = prefix.len() as u32;
        let entry = self
            .nodes
            .entry(id)
            .or_insert_with(|| (slug(prefix), depth, 0));
        entry.2 += count;

        let parent = (prefix.len() > 1).then(|| ids.id(&slug(&prefix[..prefix.len() - 1])));
        if let Some(parent) = parent {
            self.edges.insert((parent, id));
        }
        if let Some(event_id) = event {
            *self.detail_nodes.entry((event_id, id)).or_default() += count;
            if let Some(parent) = parent {
                self.detail_edges.insert((event_id, parent, id));
            }
        }
    }

    fn load_into(self, store: &mut MemoryStore, view: AggregateView) {
        let nodes = self
            .nodes
            .into_iter()
            .map(|(id, (slug, depth, occurrences))| NodeRow {
                id,
                slug,
                depth,
                played: occurrences > 0,
                occurrences,
            })
            .collect();
        let edges = self
            .edges
            .into_iter()
            .map(|(from, to)| EdgeRow { from, to })
            .collect();
        store.insert_rollup(view, nodes, edges);

        let detail_nodes = self
            .detail_nodes
            .into_iter()
            .map(|((event_id, id), occurrences)| DetailNodeRow {
                event_id,
                id,
                played: true,
                occurrences,
            })
            .collect();
        let detail_edges = self
            .detail_edges
            .into_iter()
            .map(|(event_id, from, to)| DetailEdgeRow { event_id, from, to })
            .collect();
        store.insert_detail(view, detail_nodes, detail_edges);
    }
}

fn pick_set(rng: &mut StdRng) -> (u8, u8) {
    let total: u32 = WIN_WEIGHTS.iter().sum();
    let mut roll = rng.gen_range(0..total);
    let mut index = 0;
    for (i, w) in WIN_WEIGHTS.iter().enumerate() {
        if roll < *w {
            index = i;
            break;
        }
        roll -= w;
    }
    let won = POSSIBLE_SCORES[index];
    if rng.gen_bool(0.5) {
        won
    } else {
        (won.1, won.0)
    }
}

fn simulate(rng: &mut StdRng, format: Sets) -> Vec<(u8, u8)> {
    let mut sets = Vec::with_capacity(usize::from(format.as_u8()));
    while !is_match_complete(&sets, format) {
        sets.push(pick_set(rng));
    }
    sets
}

/// Generate a store holding rollup and detail rows for every view.
pub fn generate(config: &SyntheticConfig) -> MemoryStore {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut ids = Interner::default();
    let mut store = MemoryStore::new();

    let mut events = Vec::new();
    for year in config.first_year..=config.last_year.max(config.first_year) {
        for t in 1..=config.tournaments.max(1) {
            let event_id = i64::from(year) * 100 + i64::from(t);
            store.insert_event(
                event_id,
                EventMeta {
                    year,
                    tournament_id: i64::from(t),
                },
            );
            events.push(event_id);
        }
    }

    let mut men3 = Tally::default();
    let mut women3 = Tally::default();
    let mut all3 = Tally::default();
    let mut men5 = Tally::default();
    for tally in [&mut men3, &mut women3, &mut all3] {
        tally.enumerate(Sets::Three, config.enumerate_depth, &mut ids);
    }
    men5.enumerate(Sets::Five, config.enumerate_depth, &mut ids);

    for _ in 0..config.matches {
        let event = events[rng.gen_range(0..events.len())];
        let sets = simulate(&mut rng, Sets::Three);
        men3.record(&sets, event, &mut ids);
        all3.record(&sets, event, &mut ids);

        let event = events[rng.gen_range(0..events.len())];
        let sets = simulate(&mut rng, Sets::Three);
        women3.record(&sets, event, &mut ids);
        all3.record(&sets, event, &mut ids);

        let event = events[rng.gen_range(0..events.len())];
        let sets = simulate(&mut rng, Sets::Five);
        men5.record(&sets, event, &mut ids);
    }

    men3.load_into(&mut store, AggregateView::ThreeMen);
    women3.load_into(&mut store, AggregateView::ThreeWomen);
    all3.load_into(&mut store, AggregateView::ThreeAll);
    men5.load_into(&mut store, AggregateView::FiveMen);

    info!(
        seed = config.seed,
        matches = config.matches,
        events = events.len(),
        sequences = ids.ids.len(),
        "synthetic store generated"
    );
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{AggregateExecutor, ExecutorConfig};
    use scorigami_core::filter::{FilterKey, Sex};
    use scorigami_core::types::GraphDataset;

    fn small() -> SyntheticConfig {
        SyntheticConfig {
            matches: 300,
            ..Default::default()
        }
    }

    #[test]
    fn completion_rules() {
        assert!(!is_match_complete(&[], Sets::Three));
        assert!(!is_match_complete(&[(6, 4), (3, 6)], Sets::Three));
        assert!(is_match_complete(&[(6, 4), (7, 6)], Sets::Three));
        assert!(is_match_complete(&[(4, 6), (6, 7)], Sets::Three));
        assert!(!is_match_complete(&[(6, 4), (7, 6)], Sets::Five));
        assert!(is_match_complete(&[(6, 4), (2, 6), (7, 6), (7, 5)], Sets::Five));
    }

    #[test]
    fn slugs_join_sets_with_spaces() {
        assert_eq!(slug(&[(6, 4), (3, 6)]), "6-4 3-6");
        assert_eq!(slug(&[]), "");
    }

    #[test]
    fn best_of_three_enumeration_size() {
        let mut ids = Interner::default();
        let mut tally = Tally::default();
        tally.enumerate(Sets::Three, 3, &mut ids);
        // 14 + 14² + (98 split pairs × 14)
        assert_eq!(tally.nodes.len(), 14 + 196 + 1_372);
        assert_eq!(tally.edges.len(), 196 + 1_372);
        assert!(tally.nodes.values().all(|(_, _, occ)| *occ == 0));
    }

    #[test]
    fn simulated_matches_terminate_correctly() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let three = simulate(&mut rng, Sets::Three);
            assert!((2..=3).contains(&three.len()));
            assert!(!is_match_complete(&three[..three.len() - 1], Sets::Three));
            let five = simulate(&mut rng, Sets::Five);
            assert!((3..=5).contains(&five.len()));
        }
    }

    #[test]
    fn same_seed_same_rows() {
        let a = generate(&small());
        let b = generate(&small());
        for view in AggregateView::all() {
            assert_eq!(a.views[&view].rollup_nodes, b.views[&view].rollup_nodes);
            assert_eq!(a.views[&view].detail_edges, b.views[&view].detail_edges);
        }
    }

    #[test]
    fn three_all_sums_men_and_women() {
        let store = generate(&small());
        let occ = |view: AggregateView| -> u64 {
            store.views[&view]
                .rollup_nodes
                .iter()
                .filter(|r| r.depth == 1)
                .map(|r| r.occurrences)
                .sum()
        };
        assert_eq!(occ(AggregateView::ThreeMen), 300);
        assert_eq!(occ(AggregateView::ThreeAll), 600);
    }

    #[tokio::test]
    async fn executor_reads_generated_store() {
        let exec = AggregateExecutor::new(generate(&small()), ExecutorConfig::default());
        let all = FilterKey::new(Sets::Three, Sex::Women, None, None).unwrap();
        let one_year = FilterKey::new(Sets::Three, Sex::Women, Some(2017), None).unwrap();

        let full = exec.fetch(&all).await.unwrap();
        let scoped = exec.fetch(&one_year).await.unwrap();
        assert!(full.nodes[0].is_root());
        assert_eq!(full.node_count(), scoped.node_count());
        assert!(full.scorigami_count() > 0);

        let total = |ds: &GraphDataset| -> u64 {
            ds.nodes.iter().filter(|n| n.depth == 1).map(|n| n.occurrences).sum()
        };
        assert_eq!(total(full.as_ref()), 300);
        assert!(total(scoped.as_ref()) < 300);
        assert!(total(scoped.as_ref()) > 0);
    }
}
