//! # Scorigami
//!
//! Score-sequence graphs for tennis: every distinct sequence of set scores
//! is a node, every "one more set" step an edge, and the sequences no match
//! has ever produced are the scorigami.
//!
//! ## Quick Start
//!
//! ```rust
//! use scorigami::prelude::*;
//!
//! let nodes = vec![
//!     Node::root(),
//!     Node { id: 1, slug: "6-4".into(), depth: 1, played: true, occurrences: 12, norm: 0.0 },
//!     Node { id: 2, slug: "6-4 6-0".into(), depth: 2, played: false, occurrences: 0, norm: 0.0 },
//! ];
//! let edges = vec![Edge::new(ROOT_ID, 1), Edge::new(1, 2)];
//!
//! // Assemble, reduce, lay out and encode.
//! let graph = prepare_render_graph(nodes, edges, 7, &RenderOptions::default());
//!
//! assert_eq!(graph.nodes.len(), 3);
//! assert_eq!(graph.tier, LayoutTier::Small);
//! let root = graph.node(ROOT_ID).unwrap();
//! assert_eq!((root.x, root.y), (0.0, 0.0));
//! ```
//!
//! ## Streaming a Selection
//!
//! ```rust
//! use scorigami::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> scorigami::prelude::Result<()> {
//! let key = resolve(&RawFilter::new("3", "women", "all", "all"))?.key;
//!
//! let store = generate(&SyntheticConfig { matches: 100, ..Default::default() });
//! let executor = Arc::new(AggregateExecutor::new(store, ExecutorConfig::default()));
//! let source = LocalFrameSource::new(executor, FrameEncoder::new(EncoderConfig::default().unpaced()));
//!
//! let graph = fetch_render_graph(&source, &key, &RenderOptions::default(), &CancelToken::new(), |_| {})
//!     .await?
//!     .expect("not cancelled");
//! assert!(graph.node(ROOT_ID).is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`scorigami_core`] - filter keys, frames, graph assembly, layout tiers
//! - [`scorigami_runtime`] - aggregate stores, NDJSON encoder and decoder,
//!   edge reduction, layout engine, visual encoding, the graph loader
//!
//! The HTTP server (`scorigami-web`) and the command line (`scorigami-cli`)
//! are separate binaries built on these two crates.

pub use scorigami_core as core;
pub use scorigami_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use scorigami::prelude::*;
/// ```
pub mod prelude {
    pub use scorigami_runtime::prelude::*;
}
