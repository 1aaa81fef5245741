//! Scorigami Core Prelude - convenient imports for common usage.
//!
//! ```rust
//! use scorigami_core::prelude::*;
//! ```

pub use crate::types::{Edge, GraphDataset, Node, NodeId, Position, ROOT_ID, ROOT_SLUG};

pub use crate::filter::{
    resolve, AggregateKind, AggregateSource, AggregateView, FilterKey, RawFilter,
    ResolvedFilter, Sets, Sex,
};

pub use crate::frame::{StreamFrame, StreamProgress, NDJSON_CONTENT_TYPE};

pub use crate::assemble::{assemble, assemble_with_report, check_acyclic, AssemblyReport};

pub use crate::tier::{LayoutTier, TierParams};

pub use crate::error::{
    AggregationFailure, InvalidFilterError, InvalidFilterKind, Result, ScorigamiError,
    StreamFrameParseError,
};
