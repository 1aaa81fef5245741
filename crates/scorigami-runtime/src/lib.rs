//! # Scorigami Runtime
//!
//! Everything between the aggregate store and the renderer.
//!
//! A [`FilterKey`](scorigami_core::filter::FilterKey) goes to the
//! [`executor::AggregateExecutor`], which reads one aggregate from an
//! [`store::AggregateStore`] and caches the normalized dataset. The
//! [`encoder::FrameEncoder`] streams it as NDJSON frames; the
//! [`decoder::FrameDecoder`] rebuilds node and edge lists from arbitrary
//! chunks. [`render`] then assembles, reduces, lays out and encodes the
//! graph, and [`loader::GraphLoader`] runs that pipeline for one selection
//! at a time, cancelling whatever it supersedes.

pub mod cache;
pub mod cancel;
pub mod decoder;
pub mod encoder;
pub mod encoding;
pub mod executor;
pub mod layout;
pub mod loader;
pub mod prelude;
pub mod quadtree;
pub mod reducer;
pub mod render;
pub mod scheduler;
pub mod store;
pub mod synthetic;

#[cfg(feature = "sqlite")]
pub mod sqlite_store;
