//! Error taxonomy for the score-sequence pipeline.
//!
//! Cancellation has no variant here: an aborted stream is reported as an
//! outcome by the decoder and loader.

use crate::types::NodeId;
use thiserror::Error;

/// Result type for scorigami operations.
pub type Result<T> = std::result::Result<T, ScorigamiError>;

/// Any error the pipeline can surface to a caller.
#[derive(Debug, Clone, Error)]
pub enum ScorigamiError {
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilterError),

    #[error(transparent)]
    Aggregation(#[from] AggregationFailure),

    #[error(transparent)]
    FrameParse(#[from] StreamFrameParseError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for ScorigamiError {
    fn from(e: std::io::Error) -> Self {
        ScorigamiError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ScorigamiError {
    fn from(e: serde_json::Error) -> Self {
        ScorigamiError::Serialization(e.to_string())
    }
}

/// Which filter field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidFilterKind {
    BadSetsValue,
    BadSexValue,
    IncompatibleSexSets,
    NonNumericYear,
    NonNumericTournament,
}

impl InvalidFilterKind {
    fn message(&self) -> &'static str {
        match self {
            InvalidFilterKind::BadSetsValue => "sets must be 3 or 5",
            InvalidFilterKind::BadSexValue => "gender must be men|women|all",
            InvalidFilterKind::IncompatibleSexSets => "women only play best of 3 sets",
            InvalidFilterKind::NonNumericYear => "year must be a number or 'all'",
            InvalidFilterKind::NonNumericTournament => "tournament must be a number or 'all'",
        }
    }
}

/// A client-correctable filter error, raised before any query runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} (got {:?})", .kind.message(), .value)]
pub struct InvalidFilterError {
    pub kind: InvalidFilterKind,
    /// The offending raw value.
    pub value: String,
}

impl InvalidFilterError {
    pub fn new(kind: InvalidFilterKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// The user-facing message without the echoed value.
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

/// The aggregate source could not produce a dataset. The whole fetch is
/// aborted; retrying is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationFailure {
    #[error("Aggregate query failed on {source_name}: {message}")]
    Query {
        source_name: String,
        message: String,
    },

    #[error("Self-loop at node {0}")]
    SelfLoop(NodeId),

    #[error("Cycle detected through node {0}")]
    Cycle(NodeId),

    #[error("Aggregate fetch was interrupted: {0}")]
    Interrupted(String),
}

impl AggregationFailure {
    pub fn query(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        AggregationFailure::Query {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// A single stream line that could not be parsed. Logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bad stream frame on line {line}: {message} ({excerpt:?})")]
pub struct StreamFrameParseError {
    /// 1-based line number within the stream.
    pub line: usize,
    pub message: String,
    /// Leading bytes of the offending line.
    pub excerpt: String,
}

impl StreamFrameParseError {
    const EXCERPT_LEN: usize = 80;

    pub fn new(line: usize, raw: &str, message: impl Into<String>) -> Self {
        let excerpt: String = raw.chars().take(Self::EXCERPT_LEN).collect();
        Self {
            line,
            message: message.into(),
            excerpt,
        }
    }
}
