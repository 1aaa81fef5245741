//! # Scorigami Core
//!
//! Shared types and pure graph logic for the tennis score-sequence graph:
//!
//! - **filter** - raw filter parameters to a validated [`FilterKey`] and the
//!   precomputed aggregate that answers it
//! - **frame** - the newline-delimited stream frames
//! - **assemble** - edge dedup and orphan removal into a [`GraphDataset`]
//! - **tier** - node-count performance tiers and their parameter table
//! - **error** - the error taxonomy shared by every crate
//!
//! ## Quick Start
//!
//! ```rust
//! use scorigami_core::prelude::*;
//!
//! let resolved = resolve(&RawFilter::new("3", "women", "2019", "all")).unwrap();
//! assert!(!resolved.use_rollup);
//! assert_eq!(resolved.source.nodes_relation(), "mv_graph_nodes_3_women");
//! ```
//!
//! [`FilterKey`]: filter::FilterKey
//! [`GraphDataset`]: types::GraphDataset

pub mod assemble;
pub mod error;
pub mod filter;
pub mod frame;
pub mod prelude;
pub mod tier;
pub mod types;
