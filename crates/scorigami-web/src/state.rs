//! Application state for the web server.
//!
//! Requests share only the store. Each request gets its own executor, so
//! nothing a request fetches or derives outlives it.

use anyhow::{Context, Result};
use scorigami_runtime::cache::CacheConfig;
use scorigami_runtime::encoder::{EncoderConfig, FrameEncoder};
use scorigami_runtime::executor::{AggregateExecutor, ExecutorConfig};
use scorigami_runtime::render::RenderOptions;
use scorigami_runtime::sqlite_store::SqliteStore;
use scorigami_runtime::store::{AggregateStore, MemoryStore};
use scorigami_runtime::synthetic::{generate, SyntheticConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Store behind the executor, chosen at startup.
pub type SharedStore = Arc<dyn AggregateStore>;

/// Server tunables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerConfig {
    pub encoder: EncoderConfig,
    pub render: RenderOptions,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub encoder: FrameEncoder,
    pub render: RenderOptions,
}

impl AppState {
    pub fn new(store: SharedStore, config: ServerConfig) -> Self {
        Self {
            store,
            encoder: FrameEncoder::new(config.encoder),
            render: config.render,
        }
    }

    /// Executor scoped to one request.
    pub fn executor(&self) -> AggregateExecutor<SharedStore> {
        AggregateExecutor::new(
            self.store.clone(),
            ExecutorConfig {
                cache: CacheConfig::disabled(),
                ..Default::default()
            },
        )
    }

    /// Open the store named on the command line: a SQLite database, a JSON
    /// fixture, or seeded synthetic data when neither is given.
    pub fn open(db: Option<&Path>, fixture: Option<&Path>, config: ServerConfig) -> Result<Self> {
        let store: SharedStore = match (db, fixture) {
            (Some(path), _) => {
                let store = SqliteStore::open(path)
                    .with_context(|| format!("opening database {}", path.display()))?;
                info!(path = %path.display(), "serving from SQLite");
                Arc::new(store)
            }
            (None, Some(path)) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading fixture {}", path.display()))?;
                let store: MemoryStore = serde_json::from_str(&raw)
                    .with_context(|| format!("parsing fixture {}", path.display()))?;
                info!(path = %path.display(), "serving from fixture");
                Arc::new(store)
            }
            (None, None) => {
                info!("no store given, serving synthetic data");
                Arc::new(generate(&SyntheticConfig::default()))
            }
        };
        Ok(Self::new(store, config))
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}
