//! Scorigami Runtime Prelude - convenient imports for common usage.
//!
//! ```rust
//! use scorigami_runtime::prelude::*;
//! ```

// Stores and the executor
pub use crate::cache::{CacheConfig, DatasetCache};
pub use crate::executor::{finalize, AggregateExecutor, ExecutorConfig};
pub use crate::store::{
    AggregateStore, DetailEdgeRow, DetailNodeRow, EdgeRow, EventMeta, EventScope, MemoryStore, NodeRow,
};
pub use crate::synthetic::{generate, SyntheticConfig};

#[cfg(feature = "sqlite")]
pub use crate::sqlite_store::SqliteStore;

// Streaming
pub use crate::cancel::CancelToken;
pub use crate::decoder::{decode_chunks, decode_reader, DecodeOutcome, FrameDecoder};
pub use crate::encoder::{EncodeSummary, EncoderConfig, FrameEncoder};

// Reduction, layout and encoding
pub use crate::encoding::{DepthScales, NodeColorMode, ScaleParams};
pub use crate::layout::{LayoutEngine, LayoutOptions, LayoutReport, LayoutState, StepOutcome};
pub use crate::reducer::{EdgeReducer, ReducerConfig, ReductionReport};
pub use crate::render::{prepare_render_graph, RenderEdge, RenderGraph, RenderNode, RenderOptions};
pub use crate::scheduler::{run_blocking, run_cooperative};

// Session loading
pub use crate::loader::{fetch_render_graph, FrameBody, FrameSource, GraphLoader, LoadStatus, LocalFrameSource};

// Re-export from core
pub use scorigami_core::prelude::*;
