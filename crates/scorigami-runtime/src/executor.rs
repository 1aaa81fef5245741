//! Aggregate query executor.
//!
//! Fetches node and edge rows for a [`FilterKey`] from an
//! [`AggregateStore`], orders and normalizes them, injects the `love-all`
//! root when the source has none, and validates that the result is acyclic.
//! Any failure aborts the fetch; nothing partial is returned or cached.

use crate::cache::{CacheConfig, DatasetCache};
use crate::store::{AggregateStore, EdgeRow, EventScope, NodeRow};
use scorigami_core::assemble::check_acyclic;
use scorigami_core::error::AggregationFailure;
use scorigami_core::filter::FilterKey;
use scorigami_core::types::{Edge, GraphDataset, Node, ROOT_ID};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Executor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Reject datasets containing self-loops or cycles.
    #[serde(default = "default_true")]
    pub validate_acyclic: bool,
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_true() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            validate_acyclic: true,
            cache: CacheConfig::default(),
        }
    }
}

/// Executes aggregate queries against a store.
pub struct AggregateExecutor<S> {
    store: S,
    cache: DatasetCache,
    config: ExecutorConfig,
}

impl<S: AggregateStore> AggregateExecutor<S> {
    pub fn new(store: S, config: ExecutorConfig) -> Self {
        Self {
            store,
            cache: DatasetCache::new(config.cache),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Dataset for `key`, from cache when fresh.
    pub async fn fetch(&self, key: &FilterKey) -> Result<Arc<GraphDataset>, AggregationFailure> {
        if let Some(hit) = self.cache.get(key) {
            debug!(%key, nodes = hit.node_count(), "dataset cache hit");
            return Ok(hit);
        }

        let dataset = Arc::new(self.fetch_uncached(key).await?);
        self.cache.insert(*key, dataset.clone());
        Ok(dataset)
    }

    /// Query the store, bypassing the cache.
    pub async fn fetch_uncached(&self, key: &FilterKey) -> Result<GraphDataset, AggregationFailure> {
        let source = key.source();
        let scope = EventScope::from(key);
        let started = Instant::now();

        let (rows, edge_rows) = futures::try_join!(
            self.store.fetch_nodes(source, scope),
            self.store.fetch_edges(source, scope),
        )?;
        let raw_nodes = rows.len();
        let raw_edges = edge_rows.len();

        let dataset = finalize(rows, edge_rows);
        if self.config.validate_acyclic {
            check_acyclic(&dataset.nodes, &dataset.edges)?;
        }

        info!(
            %key,
            store = self.store.name(),
            relation = %source,
            raw_nodes,
            raw_edges,
            nodes = dataset.node_count(),
            edges = dataset.edge_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregate fetched"
        );
        Ok(dataset)
    }
}

/// Order rows, compute `norm`, and inject the root when absent.
///
/// Nodes are ordered by `(depth asc, occurrences desc, id asc)`. When no
/// depth-0 row exists the canonical root is prepended along with one
/// `0 → n` edge per depth-1 node, ahead of the fetched edges.
pub fn finalize(mut rows: Vec<NodeRow>, edge_rows: Vec<EdgeRow>) -> GraphDataset {
    rows.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then(b.occurrences.cmp(&a.occurrences))
            .then(a.id.cmp(&b.id))
    });

    let max_occ = rows.iter().map(|r| r.occurrences).max().unwrap_or(0).max(1) as f64;
    let has_root = rows.iter().any(|r| r.depth == 0);

    let mut nodes = Vec::with_capacity(rows.len() + 1);
    if !has_root {
        nodes.push(Node::root());
    }
    nodes.extend(rows.into_iter().map(|r| Node {
        norm: r.occurrences as f64 / max_occ,
        id: r.id,
        slug: r.slug,
        depth: r.depth,
        played: r.played,
        occurrences: r.occurrences,
    }));

    let mut edges = Vec::with_capacity(edge_rows.len() + 16);
    if !has_root {
        edges.extend(
            nodes
                .iter()
                .filter(|n| n.depth == 1)
                .map(|n| Edge::new(ROOT_ID, n.id)),
        );
    }
    edges.extend(edge_rows.into_iter().map(|e| Edge::new(e.from, e.to)));

    GraphDataset::new(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DetailNodeRow, EventMeta, MemoryStore};
    use scorigami_core::filter::{resolve, AggregateView, RawFilter};

    fn row(id: u32, depth: u32, occurrences: u64) -> NodeRow {
        NodeRow {
            id,
            slug: format!("s{}", id),
            depth,
            played: occurrences > 0,
            occurrences,
        }
    }

    #[test]
    fn injects_root_and_normalizes() {
        let ds = finalize(vec![row(1, 1, 10), row(2, 2, 5)], vec![]);

        assert_eq!(ds.nodes[0], Node::root());
        assert_eq!(ds.edges, vec![Edge::new(0, 1)]);
        assert_eq!(ds.nodes[1].norm, 1.0);
        assert_eq!(ds.nodes[2].norm, 0.5);
    }

    #[test]
    fn every_depth_one_node_gets_one_root_edge() {
        let ds = finalize(
            vec![row(3, 1, 0), row(1, 1, 4), row(2, 1, 9), row(4, 2, 1)],
            vec![EdgeRow { from: 1, to: 4 }],
        );
        let roots: Vec<_> = ds.nodes.iter().filter(|n| n.depth == 0).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, ROOT_ID);

        for d1 in ds.nodes.iter().filter(|n| n.depth == 1) {
            let incoming = ds
                .edges
                .iter()
                .filter(|e| e.to == d1.id && e.from == ROOT_ID)
                .count();
            assert_eq!(incoming, 1, "node {}", d1.id);
        }
        // synthetic edges come first
        assert_eq!(ds.edges.last(), Some(&Edge::new(1, 4)));
    }

    #[test]
    fn ordering_is_depth_then_occurrences_then_id() {
        let ds = finalize(
            vec![row(5, 2, 3), row(4, 1, 3), row(2, 1, 7), row(3, 1, 3)],
            vec![],
        );
        let ids: Vec<_> = ds.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 2, 3, 4, 5]);
    }

    #[test]
    fn all_zero_occurrences_keeps_norm_in_range() {
        let ds = finalize(vec![row(1, 1, 0), row(2, 2, 0)], vec![]);
        assert!(ds.nodes.iter().all(|n| (0.0..=1.0).contains(&n.norm)));
        assert!(ds.nodes.iter().all(|n| n.norm == 0.0));
    }

    #[test]
    fn existing_root_is_not_duplicated() {
        let mut root = row(0, 0, 0);
        root.slug = "love-all".into();
        let ds = finalize(
            vec![root, row(1, 1, 2)],
            vec![EdgeRow { from: 0, to: 1 }],
        );
        assert_eq!(ds.nodes.iter().filter(|n| n.depth == 0).count(), 1);
        assert_eq!(ds.edges, vec![Edge::new(0, 1)]);
    }

    fn store() -> MemoryStore {
        let mut m = MemoryStore::new();
        m.insert_event(1, EventMeta { year: 2019, tournament_id: 1 });
        m.insert_rollup(
            AggregateView::ThreeMen,
            vec![row(1, 1, 10), row(2, 2, 5)],
            vec![EdgeRow { from: 1, to: 2 }],
        );
        m.insert_detail(
            AggregateView::ThreeMen,
            vec![DetailNodeRow { event_id: 1, id: 2, played: true, occurrences: 3 }],
            vec![],
        );
        m
    }

    #[tokio::test]
    async fn fetch_caches_by_key() {
        let exec = AggregateExecutor::new(store(), ExecutorConfig::default());
        let key = resolve(&RawFilter::new("3", "men", "all", "all")).unwrap().key;

        let a = exec.fetch(&key).await.unwrap();
        let b = exec.fetch(&key).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(exec.cache().len(), 1);
        assert_eq!(a.node_count(), 3);

        exec.cache().clear();
        let c = exec.fetch(&key).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn detail_fetch_renormalizes() {
        let exec = AggregateExecutor::new(store(), ExecutorConfig::default());
        let key = resolve(&RawFilter::new("3", "men", "2019", "all")).unwrap().key;
        let ds = exec.fetch(&key).await.unwrap();

        let two = ds.nodes.iter().find(|n| n.id == 2).unwrap();
        let one = ds.nodes.iter().find(|n| n.id == 1).unwrap();
        assert_eq!(two.norm, 1.0);
        assert_eq!(one.occurrences, 0);
        assert!(!one.played);
    }

    #[tokio::test]
    async fn store_error_aborts_fetch() {
        let exec = AggregateExecutor::new(MemoryStore::failing("boom"), ExecutorConfig::default());
        let key = resolve(&RawFilter::default()).unwrap().key;
        let err = exec.fetch(&key).await.unwrap_err();
        assert!(matches!(err, AggregationFailure::Query { .. }));
        assert!(exec.cache().is_empty());
    }

    #[tokio::test]
    async fn cyclic_source_is_rejected() {
        let mut m = MemoryStore::new();
        m.insert_rollup(
            AggregateView::FiveMen,
            vec![row(1, 1, 1), row(2, 2, 1)],
            vec![EdgeRow { from: 1, to: 2 }, EdgeRow { from: 2, to: 1 }],
        );
        let exec = AggregateExecutor::new(m, ExecutorConfig::default());
        let key = resolve(&RawFilter::default()).unwrap().key;
        assert!(matches!(
            exec.fetch(&key).await,
            Err(AggregationFailure::Cycle(_))
        ));
    }
}
