//! Aggregate stores: the query source behind the executor.
//!
//! A store answers two questions for a resolved [`AggregateSource`]: which
//! node rows and which edge rows it holds. Rollup sources are read as-is.
//! Detail sources re-derive `played`/`occurrences` per node from the rows
//! whose event matches the [`EventScope`], over the full node set of the
//! matching rollup, and group edges on `(from, to)`.

use async_trait::async_trait;
use scorigami_core::error::AggregationFailure;
use scorigami_core::filter::{AggregateKind, AggregateSource, AggregateView, FilterKey};
use scorigami_core::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// A raw node row, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: NodeId,
    pub slug: String,
    pub depth: u32,
    pub played: bool,
    pub occurrences: u64,
}

/// A raw edge row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeRow {
    pub from: NodeId,
    pub to: NodeId,
}

/// Year/tournament restriction applied to detail sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventScope {
    pub year: Option<i32>,
    pub tournament: Option<i64>,
}

impl EventScope {
    pub fn matches(&self, event: &EventMeta) -> bool {
        self.year.map_or(true, |y| event.year == y)
            && self.tournament.map_or(true, |t| event.tournament_id == t)
    }
}

impl From<&FilterKey> for EventScope {
    fn from(key: &FilterKey) -> Self {
        Self {
            year: key.year(),
            tournament: key.tournament(),
        }
    }
}

/// Event metadata joined against detail rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub year: i32,
    pub tournament_id: i64,
}

/// Query source for precomputed aggregates.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    async fn fetch_nodes(
        &self,
        source: AggregateSource,
        scope: EventScope,
    ) -> Result<Vec<NodeRow>, AggregationFailure>;

    async fn fetch_edges(
        &self,
        source: AggregateSource,
        scope: EventScope,
    ) -> Result<Vec<EdgeRow>, AggregationFailure>;
}

#[async_trait]
impl<S: AggregateStore + ?Sized> AggregateStore for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_nodes(
        &self,
        source: AggregateSource,
        scope: EventScope,
    ) -> Result<Vec<NodeRow>, AggregationFailure> {
        (**self).fetch_nodes(source, scope).await
    }

    async fn fetch_edges(
        &self,
        source: AggregateSource,
        scope: EventScope,
    ) -> Result<Vec<EdgeRow>, AggregationFailure> {
        (**self).fetch_edges(source, scope).await
    }
}

/// A detail node row attributed to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailNodeRow {
    pub event_id: i64,
    pub id: NodeId,
    pub played: bool,
    pub occurrences: u64,
}

/// A detail edge row attributed to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEdgeRow {
    pub event_id: i64,
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ViewTables {
    pub(crate) rollup_nodes: Vec<NodeRow>,
    pub(crate) rollup_edges: Vec<EdgeRow>,
    pub(crate) detail_nodes: Vec<DetailNodeRow>,
    pub(crate) detail_edges: Vec<DetailEdgeRow>,
}

/// In-memory aggregate store.
///
/// Holds the rollup and detail rows of every view plus the event table.
/// Serializes to JSON, which is the fixture format the CLI reads and
/// writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    pub(crate) views: HashMap<AggregateView, ViewTables>,
    pub(crate) events: HashMap<i64, EventMeta>,
    /// Fail every query with this message.
    #[serde(skip)]
    failure: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every query fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn insert_event(&mut self, event_id: i64, meta: EventMeta) {
        self.events.insert(event_id, meta);
    }

    pub fn insert_rollup(&mut self, view: AggregateView, nodes: Vec<NodeRow>, edges: Vec<EdgeRow>) {
        let tables = self.views.entry(view).or_default();
        tables.rollup_nodes.extend(nodes);
        tables.rollup_edges.extend(edges);
    }

    pub fn insert_detail(
        &mut self,
        view: AggregateView,
        nodes: Vec<DetailNodeRow>,
        edges: Vec<DetailEdgeRow>,
    ) {
        let tables = self.views.entry(view).or_default();
        tables.detail_nodes.extend(nodes);
        tables.detail_edges.extend(edges);
    }

    /// Rollup node and edge row counts per view.
    pub fn stats(&self) -> Vec<(AggregateView, usize, usize)> {
        AggregateView::all()
            .into_iter()
            .map(|view| {
                let t = self.views.get(&view);
                (
                    view,
                    t.map_or(0, |t| t.rollup_nodes.len()),
                    t.map_or(0, |t| t.rollup_edges.len()),
                )
            })
            .collect()
    }

    fn tables(&self, source: &AggregateSource) -> Result<&ViewTables, AggregationFailure> {
        if let Some(message) = &self.failure {
            return Err(AggregationFailure::query(source.nodes_relation(), message.clone()));
        }
        self.views.get(&source.view).ok_or_else(|| {
            AggregationFailure::query(source.nodes_relation(), "relation does not exist")
        })
    }

    fn event_in_scope(&self, event_id: i64, scope: &EventScope) -> bool {
        self.events
            .get(&event_id)
            .map_or(false, |meta| scope.matches(meta))
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_nodes(
        &self,
        source: AggregateSource,
        scope: EventScope,
    ) -> Result<Vec<NodeRow>, AggregationFailure> {
        let tables = self.tables(&source)?;
        match source.kind {
            AggregateKind::Rollup => Ok(tables.rollup_nodes.clone()),
            AggregateKind::Detail => {
                let mut grouped: HashMap<NodeId, (bool, u64)> = HashMap::new();
                for row in &tables.detail_nodes {
                    if !self.event_in_scope(row.event_id, &scope) {
                        continue;
                    }
                    let entry = grouped.entry(row.id).or_insert((false, 0));
                    entry.0 |= row.played;
                    entry.1 += row.occurrences;
                }

                Ok(tables
                    .rollup_nodes
                    .iter()
                    .map(|base| {
                        let (played, occurrences) =
                            grouped.get(&base.id).copied().unwrap_or((false, 0));
                        NodeRow {
                            played,
                            occurrences,
                            ..base.clone()
                        }
                    })
                    .collect())
            }
        }
    }

    async fn fetch_edges(
        &self,
        source: AggregateSource,
        scope: EventScope,
    ) -> Result<Vec<EdgeRow>, AggregationFailure> {
        let tables = self.tables(&source)?;
        match source.kind {
            AggregateKind::Rollup => Ok(tables.rollup_edges.clone()),
            AggregateKind::Detail => {
                let grouped: BTreeSet<EdgeRow> = tables
                    .detail_edges
                    .iter()
                    .filter(|row| self.event_in_scope(row.event_id, &scope))
                    .map(|row| EdgeRow {
                        from: row.from,
                        to: row.to,
                    })
                    .collect();
                Ok(grouped.into_iter().collect())
            }
        }
    }
}
