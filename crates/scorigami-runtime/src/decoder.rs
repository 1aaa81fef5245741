//! Incremental stream decoder.
//!
//! Bytes are buffered as bytes, not text, so a multi-byte character split
//! across two reads is reassembled before it is decoded. Each complete line
//! is parsed on its own: a bad line is logged, counted and skipped, and the
//! stream carries on.

use crate::cancel::CancelToken;
use futures::{Stream, StreamExt};
use scorigami_core::error::{ScorigamiError, StreamFrameParseError};
use scorigami_core::frame::{StreamFrame, StreamProgress, FRAME_DELIMITER};
use scorigami_core::types::{Edge, Node, NodeId};
use std::collections::HashSet;
use std::fmt::Display;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

const READ_BUF: usize = 64 * 1024;

/// Accumulates nodes and edges from NDJSON frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a delimiter.
    scanned: usize,
    line_no: usize,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    seen_nodes: HashSet<NodeId>,
    seen_edges: HashSet<Edge>,
    progress: StreamProgress,
    parse_errors: usize,
    last_error: Option<StreamFrameParseError>,
    duplicates: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and parse every complete line in the buffer.
    /// Returns the number of frames applied.
    ///
    /// A partial line is searched once: later chunks resume the search where
    /// the previous one stopped.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        self.buffer.extend_from_slice(chunk);

        let mut applied = 0;
        let mut start = 0;
        let mut search = self.scanned;
        while let Some(offset) = self.buffer[search..]
            .iter()
            .position(|b| *b == FRAME_DELIMITER)
        {
            let end = search + offset;
            let line = self.buffer[start..end].to_vec();
            start = end + 1;
            search = start;
            if self.parse_line(&line) {
                applied += 1;
            }
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        applied
    }

    /// Parse whatever is left in the buffer as a final, unterminated line.
    pub fn finish(&mut self) -> usize {
        if self.buffer.is_empty() {
            return 0;
        }
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        usize::from(self.parse_line(&rest))
    }

    pub fn progress(&self) -> StreamProgress {
        self.progress
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Lines that failed to parse.
    pub fn parse_errors(&self) -> usize {
        self.parse_errors
    }

    pub fn last_error(&self) -> Option<&StreamFrameParseError> {
        self.last_error.as_ref()
    }

    /// Nodes or edges dropped because their id or `(from, to)` pair was
    /// already received.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Bytes held back waiting for a delimiter.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }

    fn parse_line(&mut self, raw: &[u8]) -> bool {
        self.line_no += 1;
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        let text = match std::str::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => {
                let lossy = String::from_utf8_lossy(raw).into_owned();
                self.reject(StreamFrameParseError::new(self.line_no, &lossy, e.to_string()));
                return false;
            }
        };
        if text.trim().is_empty() {
            return false;
        }

        match serde_json::from_str::<StreamFrame>(text) {
            Ok(frame) => {
                self.apply(frame);
                true
            }
            Err(e) => {
                self.reject(StreamFrameParseError::new(self.line_no, text, e.to_string()));
                false
            }
        }
    }

    fn reject(&mut self, error: StreamFrameParseError) {
        warn!(line = error.line, error = %error.message, "skipping bad stream frame");
        self.parse_errors += 1;
        self.last_error = Some(error);
    }

    fn apply(&mut self, frame: StreamFrame) {
        match frame {
            StreamFrame::Meta {
                total_nodes,
                total_edges,
            } => {
                self.progress.total_nodes = Some(total_nodes);
                self.progress.total_edges = Some(total_edges);
            }
            StreamFrame::Nodes { data } => {
                for node in data {
                    if self.seen_nodes.insert(node.id) {
                        self.nodes.push(node);
                    } else {
                        self.duplicates += 1;
                    }
                }
                self.progress.loaded_nodes = self.nodes.len();
                debug!(loaded = self.nodes.len(), "node batch decoded");
            }
            StreamFrame::Edges { data } => {
                for edge in data {
                    if self.seen_edges.insert(edge) {
                        self.edges.push(edge);
                    } else {
                        self.duplicates += 1;
                    }
                }
                self.progress.loaded_edges = self.edges.len();
                debug!(loaded = self.edges.len(), "edge batch decoded");
            }
            StreamFrame::Complete => {
                self.progress.complete = true;
            }
        }
    }
}

/// How a decode run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The byte stream ended. `complete` is whether a `complete` frame was
    /// received before it did.
    Finished { complete: bool },
    /// The cancel token fired; the reader was released mid-stream.
    Aborted,
}

/// Drive `decoder` from an async reader until EOF or cancellation.
///
/// The reader is consumed and dropped before returning in either case.
pub async fn decode_reader<R, F>(
    mut reader: R,
    decoder: &mut FrameDecoder,
    cancel: &CancelToken,
    mut on_progress: F,
) -> Result<DecodeOutcome, ScorigamiError>
where
    R: AsyncRead + Unpin,
    F: FnMut(&StreamProgress),
{
    let mut buf = vec![0u8; READ_BUF];
    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("decode cancelled");
                return Ok(DecodeOutcome::Aborted);
            }
            read = reader.read(&mut buf) => read?,
        };
        if read == 0 {
            break;
        }
        if decoder.feed(&buf[..read]) > 0 {
            on_progress(&decoder.progress());
        }
    }

    decoder.finish();
    on_progress(&decoder.progress());
    Ok(DecodeOutcome::Finished {
        complete: decoder.progress().complete,
    })
}

/// Drive `decoder` from a stream of byte chunks until it ends or the token
/// fires. A chunk error ends the run with [`ScorigamiError::Io`].
pub async fn decode_chunks<S, B, E, F>(
    mut chunks: S,
    decoder: &mut FrameDecoder,
    cancel: &CancelToken,
    mut on_progress: F,
) -> Result<DecodeOutcome, ScorigamiError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
    F: FnMut(&StreamProgress),
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("decode cancelled");
                return Ok(DecodeOutcome::Aborted);
            }
            next = chunks.next() => next,
        };
        match next {
            Some(Ok(chunk)) => {
                if decoder.feed(chunk.as_ref()) > 0 {
                    on_progress(&decoder.progress());
                }
            }
            Some(Err(e)) => return Err(ScorigamiError::Io(e.to_string())),
            None => break,
        }
    }

    decoder.finish();
    on_progress(&decoder.progress());
    Ok(DecodeOutcome::Finished {
        complete: decoder.progress().complete,
    })
}
