//! Wire frames for the newline-delimited graph stream.
//!
//! A well-formed stream is one `meta` frame, any interleaving of `nodes`
//! and `edges` batches, then one `complete` frame. Each frame is a single
//! JSON object on its own line.

use crate::types::{Edge, Node};
use serde::{Deserialize, Serialize};

/// Content type of a frame stream.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Frame delimiter.
pub const FRAME_DELIMITER: u8 = b'\n';

/// One frame of the graph stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    Meta {
        #[serde(rename = "totalNodes")]
        total_nodes: usize,
        #[serde(rename = "totalEdges")]
        total_edges: usize,
    },
    Nodes {
        data: Vec<Node>,
    },
    Edges {
        data: Vec<Edge>,
    },
    Complete,
}

impl StreamFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamFrame::Meta { .. } => "meta",
            StreamFrame::Nodes { .. } => "nodes",
            StreamFrame::Edges { .. } => "edges",
            StreamFrame::Complete => "complete",
        }
    }

    /// Serialize as one delimited line, trailing `\n` included.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(FRAME_DELIMITER);
        Ok(line)
    }
}

/// Decoder progress. Totals are `None` until a `meta` frame is seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProgress {
    pub loaded_nodes: usize,
    pub total_nodes: Option<usize>,
    pub loaded_edges: usize,
    pub total_edges: Option<usize>,
    pub complete: bool,
}

impl StreamProgress {
    /// Fraction of nodes received, if the total is known.
    pub fn node_fraction(&self) -> Option<f64> {
        fraction(self.loaded_nodes, self.total_nodes)
    }

    /// Fraction of edges received, if the total is known.
    pub fn edge_fraction(&self) -> Option<f64> {
        fraction(self.loaded_edges, self.total_edges)
    }

    /// Combined fraction over nodes and edges.
    pub fn overall_fraction(&self) -> Option<f64> {
        let total = self.total_nodes? + self.total_edges?;
        fraction(self.loaded_nodes + self.loaded_edges, Some(total))
    }
}

fn fraction(loaded: usize, total: Option<usize>) -> Option<f64> {
    match total? {
        0 => Some(1.0),
        t => Some((loaded as f64 / t as f64).min(1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_uses_camel_case_totals() {
        let line = StreamFrame::Meta {
            total_nodes: 3,
            total_edges: 2,
        }
        .to_line()
        .unwrap();
        assert_eq!(
            String::from_utf8(line).unwrap(),
            "{\"type\":\"meta\",\"totalNodes\":3,\"totalEdges\":2}\n"
        );
    }

    #[test]
    fn complete_and_edges_parse() {
        let f: StreamFrame = serde_json::from_str(r#"{"type":"complete"}"#).unwrap();
        assert_eq!(f, StreamFrame::Complete);

        let f: StreamFrame =
            serde_json::from_str(r#"{"type":"edges","data":[{"from":0,"to":1}]}"#).unwrap();
        assert_eq!(
            f,
            StreamFrame::Edges {
                data: vec![Edge::new(0, 1)]
            }
        );
    }

    #[test]
    fn progress_without_meta_has_no_fraction() {
        let p = StreamProgress {
            loaded_nodes: 10,
            ..Default::default()
        };
        assert_eq!(p.node_fraction(), None);
        assert_eq!(p.overall_fraction(), None);

        let p = StreamProgress {
            loaded_nodes: 5,
            total_nodes: Some(10),
            loaded_edges: 0,
            total_edges: Some(0),
            complete: false,
        };
        assert_eq!(p.node_fraction(), Some(0.5));
        assert_eq!(p.edge_fraction(), Some(1.0));
    }
}
