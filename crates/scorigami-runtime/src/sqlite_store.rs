//! SQLite-backed aggregate store.
//!
//! Each aggregate is a plain table named after its relation
//! (`mv_graph_nodes_3_men_all`, `mv_graph_edges_3_men`, ...), plus an
//! `event` table the detail rows join against. Queries run on tokio's
//! blocking pool.

#![cfg(feature = "sqlite")]

use crate::store::{
    AggregateStore, DetailEdgeRow, DetailNodeRow, EdgeRow, EventScope, MemoryStore, NodeRow,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, Result as SqlResult};
use scorigami_core::error::AggregationFailure;
use scorigami_core::filter::{AggregateKind, AggregateSource, AggregateView};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// SQLite aggregate store.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a new in-memory database with an empty schema.
    pub fn new_in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_with_connection(conn)
    }

    /// Create or open a file-backed database.
    pub fn open<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS event (
                event_id INTEGER PRIMARY KEY,
                event_year INTEGER NOT NULL,
                tournament_id INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_event_year ON event(event_year);
            CREATE INDEX IF NOT EXISTS idx_event_tournament ON event(tournament_id);
            "#,
        )?;

        for view in AggregateView::all() {
            let rollup = AggregateSource {
                view,
                kind: AggregateKind::Rollup,
            };
            let detail = AggregateSource {
                view,
                kind: AggregateKind::Detail,
            };
            conn.execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {rn} (
                    id INTEGER PRIMARY KEY,
                    slug TEXT NOT NULL,
                    depth INTEGER NOT NULL,
                    played INTEGER NOT NULL,
                    occurrences INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS {re} (
                    frm INTEGER NOT NULL,
                    "to" INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS {dn} (
                    event_id INTEGER NOT NULL,
                    id INTEGER NOT NULL,
                    played INTEGER NOT NULL,
                    occurrences INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS {de} (
                    event_id INTEGER NOT NULL,
                    frm INTEGER NOT NULL,
                    "to" INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{dn}_event ON {dn}(event_id);
                CREATE INDEX IF NOT EXISTS idx_{de}_event ON {de}(event_id);
                "#,
                rn = rollup.nodes_relation(),
                re = rollup.edges_relation(),
                dn = detail.nodes_relation(),
                de = detail.edges_relation(),
            ))?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Row counts of the rollup tables, per view.
    pub fn stats(&self) -> SqlResult<Vec<(AggregateView, usize, usize)>> {
        let conn = self.lock()?;
        AggregateView::all()
            .into_iter()
            .map(|view| {
                let source = AggregateSource {
                    view,
                    kind: AggregateKind::Rollup,
                };
                let nodes: usize = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {}", source.nodes_relation()),
                    [],
                    |row| row.get(0),
                )?;
                let edges: usize = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {}", source.edges_relation()),
                    [],
                    |row| row.get(0),
                )?;
                Ok((view, nodes, edges))
            })
            .collect()
    }

    /// Copy every table of a [`MemoryStore`] into this database in one
    /// transaction. Existing rows are kept.
    pub fn import(&self, store: &MemoryStore) -> SqlResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut rows = 0usize;

        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO event (event_id, event_year, tournament_id) VALUES (?1, ?2, ?3)",
            )?;
            for (event_id, meta) in &store.events {
                stmt.execute(params![event_id, meta.year, meta.tournament_id])?;
                rows += 1;
            }
        }

        for (view, tables) in &store.views {
            let rollup = AggregateSource {
                view: *view,
                kind: AggregateKind::Rollup,
            };
            let detail = AggregateSource {
                view: *view,
                kind: AggregateKind::Detail,
            };

            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {} (id, slug, depth, played, occurrences) VALUES (?1, ?2, ?3, ?4, ?5)",
                rollup.nodes_relation()
            ))?;
            for n in &tables.rollup_nodes {
                stmt.execute(params![n.id, n.slug, n.depth, n.played, n.occurrences as i64])?;
            }

            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (frm, \"to\") VALUES (?1, ?2)",
                rollup.edges_relation()
            ))?;
            for e in &tables.rollup_edges {
                stmt.execute(params![e.from, e.to])?;
            }

            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (event_id, id, played, occurrences) VALUES (?1, ?2, ?3, ?4)",
                detail.nodes_relation()
            ))?;
            for DetailNodeRow {
                event_id,
                id,
                played,
                occurrences,
            } in &tables.detail_nodes
            {
                stmt.execute(params![event_id, id, played, *occurrences as i64])?;
            }

            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (event_id, frm, \"to\") VALUES (?1, ?2, ?3)",
                detail.edges_relation()
            ))?;
            for DetailEdgeRow { event_id, from, to } in &tables.detail_edges {
                stmt.execute(params![event_id, from, to])?;
            }

            rows += tables.rollup_nodes.len()
                + tables.rollup_edges.len()
                + tables.detail_nodes.len()
                + tables.detail_edges.len();
            debug!(view = ?view, "imported aggregate tables");
        }

        tx.commit()?;
        info!(rows, "imported memory store into sqlite");
        Ok(rows)
    }

    fn lock(&self) -> SqlResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            rusqlite::Error::InvalidParameterName("sqlite connection lock poisoned".into())
        })
    }

    async fn run_blocking<T, F>(&self, relation: String, f: F) -> Result<T, AggregationFailure>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> SqlResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let rel = relation.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AggregationFailure::query(&rel, "connection lock poisoned"))?;
            f(&guard).map_err(|e| AggregationFailure::query(&rel, e.to_string()))
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(e) => Err(AggregationFailure::Interrupted(format!("{}: {}", relation, e))),
        }
    }
}

fn node_row(row: &rusqlite::Row<'_>) -> SqlResult<NodeRow> {
    Ok(NodeRow {
        id: row.get(0)?,
        slug: row.get(1)?,
        depth: row.get(2)?,
        played: row.get(3)?,
        occurrences: row.get::<_, i64>(4)?.max(0) as u64,
    })
}

fn edge_row(row: &rusqlite::Row<'_>) -> SqlResult<EdgeRow> {
    Ok(EdgeRow {
        from: row.get(0)?,
        to: row.get(1)?,
    })
}

#[async_trait]
impl AggregateStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch_nodes(
        &self,
        source: AggregateSource,
        scope: EventScope,
    ) -> Result<Vec<NodeRow>, AggregationFailure> {
        let sql = match source.kind {
            AggregateKind::Rollup => format!(
                "SELECT id, slug, depth, played, occurrences FROM {} ORDER BY depth",
                source.nodes_relation()
            ),
            AggregateKind::Detail => format!(
                r#"
                SELECT b.id, b.slug, b.depth,
                       COALESCE(f.played, 0), COALESCE(f.occurrences, 0)
                FROM {base} AS b
                LEFT JOIN (
                    SELECT d.id, MAX(d.played) AS played, SUM(d.occurrences) AS occurrences
                    FROM {detail} AS d
                    INNER JOIN event AS e ON d.event_id = e.event_id
                    WHERE (?1 IS NULL OR e.event_year = ?1)
                      AND (?2 IS NULL OR e.tournament_id = ?2)
                    GROUP BY d.id
                ) AS f ON f.id = b.id
                ORDER BY b.depth
                "#,
                base = source.base_nodes_relation(),
                detail = source.nodes_relation(),
            ),
        };
        let kind = source.kind;

        self.run_blocking(source.nodes_relation(), move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = match kind {
                AggregateKind::Rollup => stmt.query_map([], node_row)?,
                AggregateKind::Detail => {
                    stmt.query_map(params![scope.year, scope.tournament], node_row)?
                }
            };
            rows.collect()
        })
        .await
    }

    async fn fetch_edges(
        &self,
        source: AggregateSource,
        scope: EventScope,
    ) -> Result<Vec<EdgeRow>, AggregationFailure> {
        let sql = match source.kind {
            AggregateKind::Rollup => {
                format!("SELECT frm, \"to\" FROM {}", source.edges_relation())
            }
            AggregateKind::Detail => format!(
                r#"
                SELECT d.frm, d."to"
                FROM {detail} AS d
                INNER JOIN event AS e ON d.event_id = e.event_id
                WHERE (?1 IS NULL OR e.event_year = ?1)
                  AND (?2 IS NULL OR e.tournament_id = ?2)
                GROUP BY d.frm, d."to"
                ORDER BY d.frm, d."to"
                "#,
                detail = source.edges_relation(),
            ),
        };
        let kind = source.kind;

        self.run_blocking(source.edges_relation(), move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = match kind {
                AggregateKind::Rollup => stmt.query_map([], edge_row)?,
                AggregateKind::Detail => {
                    stmt.query_map(params![scope.year, scope.tournament], edge_row)?
                }
            };
            rows.collect()
        })
        .await
    }
}
