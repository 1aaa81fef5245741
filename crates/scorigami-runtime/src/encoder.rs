//! Stream encoder: a dataset as an ordered run of NDJSON frames.
//!
//! Order is `meta`, node batches, edge batches, `complete`. Every frame is
//! serialized in full before it is handed to the writer or channel, so a
//! frame is never split across two writes.

use scorigami_core::error::ScorigamiError;
use scorigami_core::frame::StreamFrame;
use scorigami_core::types::GraphDataset;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

/// Batch sizing and pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_node_batch")]
    pub node_batch: usize,
    #[serde(default = "default_edge_batch")]
    pub edge_batch: usize,
    /// Pause between batch frames, in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

fn default_node_batch() -> usize {
    5_000
}

fn default_edge_batch() -> usize {
    2_000
}

fn default_batch_delay_ms() -> u64 {
    10
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            node_batch: default_node_batch(),
            edge_batch: default_edge_batch(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl EncoderConfig {
    /// Same batching without pacing.
    pub fn unpaced(self) -> Self {
        Self {
            batch_delay_ms: 0,
            ..self
        }
    }
}

/// What an encode run delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    pub frames: usize,
    pub bytes: usize,
    /// `false` when the consumer went away before `complete`.
    pub completed: bool,
}

/// NDJSON frame encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEncoder {
    config: EncoderConfig,
}

impl FrameEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// All frames for `dataset`, in wire order.
    pub fn frames<'a>(&self, dataset: &'a GraphDataset) -> impl Iterator<Item = StreamFrame> + 'a {
        let meta = StreamFrame::Meta {
            total_nodes: dataset.node_count(),
            total_edges: dataset.edge_count(),
        };
        let nodes = dataset
            .nodes
            .chunks(self.config.node_batch.max(1))
            .map(|chunk| StreamFrame::Nodes {
                data: chunk.to_vec(),
            });
        let edges = dataset
            .edges
            .chunks(self.config.edge_batch.max(1))
            .map(|chunk| StreamFrame::Edges {
                data: chunk.to_vec(),
            });

        std::iter::once(meta)
            .chain(nodes)
            .chain(edges)
            .chain(std::iter::once(StreamFrame::Complete))
    }

    /// Encode the whole stream into one buffer.
    pub fn encode_to_vec(&self, dataset: &GraphDataset) -> Result<Vec<u8>, ScorigamiError> {
        let mut out = Vec::new();
        for frame in self.frames(dataset) {
            out.extend_from_slice(&frame.to_line()?);
        }
        Ok(out)
    }

    /// Write every frame to `writer`, one `write_all` per frame.
    pub async fn write_frames<W>(
        &self,
        dataset: &GraphDataset,
        writer: &mut W,
    ) -> Result<EncodeSummary, ScorigamiError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut summary = EncodeSummary::default();
        for frame in self.frames(dataset) {
            let paced = is_batch(&frame);
            let line = frame.to_line()?;
            writer.write_all(&line).await?;
            summary.frames += 1;
            summary.bytes += line.len();
            debug!(kind = frame.kind(), bytes = line.len(), "frame written");
            if paced {
                self.pause().await;
            }
        }
        writer.flush().await?;
        summary.completed = true;
        Ok(summary)
    }

    /// Push every frame into `tx`. Stops quietly when the receiver has been
    /// dropped, which is how a cancelled client shows up on this side.
    pub async fn send_frames(
        &self,
        dataset: &GraphDataset,
        tx: &mpsc::Sender<Vec<u8>>,
    ) -> Result<EncodeSummary, ScorigamiError> {
        let mut summary = EncodeSummary::default();
        for frame in self.frames(dataset) {
            let paced = is_batch(&frame);
            let line = frame.to_line()?;
            let len = line.len();
            if tx.send(line).await.is_err() {
                debug!(frames = summary.frames, "stream receiver closed");
                return Ok(summary);
            }
            summary.frames += 1;
            summary.bytes += len;
            if paced {
                self.pause().await;
            }
        }
        summary.completed = true;
        Ok(summary)
    }

    async fn pause(&self) {
        if self.config.batch_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
        }
    }
}

fn is_batch(frame: &StreamFrame) -> bool {
    matches!(frame, StreamFrame::Nodes { .. } | StreamFrame::Edges { .. })
}
