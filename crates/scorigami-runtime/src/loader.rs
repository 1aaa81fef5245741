//! Session loader: one in-flight graph request at a time.
//!
//! Every [`GraphLoader::load`] supersedes the previous request. The old
//! request's token is cancelled and its task aborted, and a generation
//! counter guards the status channel so a superseded task can never publish
//! over the current one.

use crate::cancel::CancelToken;
use crate::decoder::{decode_chunks, decode_reader, DecodeOutcome, FrameDecoder};
use crate::encoder::FrameEncoder;
use crate::executor::AggregateExecutor;
use crate::render::{prepare_render_graph_cooperative, RenderGraph, RenderOptions};
use crate::store::AggregateStore;
use async_trait::async_trait;
use futures::Stream;
use scorigami_core::error::ScorigamiError;
use scorigami_core::filter::FilterKey;
use scorigami_core::frame::StreamProgress;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Byte chunks of an NDJSON frame stream.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ScorigamiError>> + Send>>;

/// An opened frame stream.
pub enum FrameBody {
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    Chunks(ChunkStream),
}

/// Where frames for a filter selection come from.
#[async_trait]
pub trait FrameSource: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Open the stream for `key`. Errors here mean nothing was streamed.
    async fn open(&self, key: &FilterKey) -> Result<FrameBody, ScorigamiError>;

    /// The session reading from this source is over. Sources holding
    /// per-session state release it here.
    fn end_session(&self) {}
}

/// Frames straight from an executor, through an in-memory pipe.
pub struct LocalFrameSource<S> {
    executor: Arc<AggregateExecutor<S>>,
    encoder: FrameEncoder,
}

impl<S: AggregateStore + 'static> LocalFrameSource<S> {
    pub fn new(executor: Arc<AggregateExecutor<S>>, encoder: FrameEncoder) -> Self {
        Self { executor, encoder }
    }

    pub fn executor(&self) -> &Arc<AggregateExecutor<S>> {
        &self.executor
    }
}

#[async_trait]
impl<S: AggregateStore + 'static> FrameSource for LocalFrameSource<S> {
    fn name(&self) -> &str {
        "local"
    }

    async fn open(&self, key: &FilterKey) -> Result<FrameBody, ScorigamiError> {
        let dataset = self.executor.fetch(key).await?;
        let (mut writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let encoder = self.encoder;
        tokio::spawn(async move {
            if let Err(e) = encoder.write_frames(&dataset, &mut writer).await {
                // the reading half was dropped
                debug!(error = %e, "local frame writer stopped");
            }
        });
        Ok(FrameBody::Reader(Box::new(reader)))
    }

    fn end_session(&self) {
        let cached = self.executor.cache().len();
        self.executor.cache().clear();
        debug!(cached, "session cache cleared");
    }
}

/// Where a load stands.
#[derive(Debug, Clone)]
pub enum LoadStatus {
    Idle,
    Loading {
        key: FilterKey,
        generation: u64,
        progress: StreamProgress,
    },
    Ready {
        key: FilterKey,
        generation: u64,
        graph: Arc<RenderGraph>,
    },
    Failed {
        key: FilterKey,
        generation: u64,
        message: String,
    },
    Cancelled {
        key: FilterKey,
        generation: u64,
    },
}

impl LoadStatus {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Idle => 0,
            Self::Loading { generation, .. }
            | Self::Ready { generation, .. }
            | Self::Failed { generation, .. }
            | Self::Cancelled { generation, .. } => *generation,
        }
    }

    /// Loading is the only non-terminal state.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Loading { .. })
    }
}

struct Shared {
    status: watch::Sender<LoadStatus>,
    generation: AtomicU64,
}

impl Shared {
    /// Bump the generation and publish the status built for it, atomically
    /// with respect to [`Shared::publish`].
    fn advance(&self, status_for: impl FnOnce(u64) -> LoadStatus) -> u64 {
        let mut generation = 0;
        self.status.send_modify(|status| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *status = status_for(generation);
        });
        generation
    }

    /// Publish only if `generation` is still the current one.
    fn publish(&self, generation: u64, next: LoadStatus) -> bool {
        self.status.send_if_modified(|status| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *status = next;
            true
        })
    }
}

struct InFlight {
    key: FilterKey,
    generation: u64,
    cancel: CancelToken,
    task: JoinHandle<()>,
}

/// Loads render graphs for successive filter selections.
///
/// A loader is one session. Dropping it stops the in-flight load and ends
/// the session on its source, which releases any datasets cached for it.
pub struct GraphLoader<F: FrameSource> {
    source: Arc<F>,
    options: RenderOptions,
    shared: Arc<Shared>,
    current: Mutex<Option<InFlight>>,
}

impl<F: FrameSource> GraphLoader<F> {
    pub fn new(source: Arc<F>, options: RenderOptions) -> Self {
        let (status, _) = watch::channel(LoadStatus::Idle);
        Self {
            source,
            options,
            shared: Arc::new(Shared {
                status,
                generation: AtomicU64::new(0),
            }),
            current: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn status(&self) -> LoadStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadStatus> {
        self.shared.status.subscribe()
    }

    /// Current generation; 0 before the first load.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Start loading `key`, superseding whatever is in flight. Must be
    /// called from within a Tokio runtime. Returns the new generation.
    pub fn load(&self, key: FilterKey) -> u64 {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = current.take() {
            stop(&prev);
        }

        let cancel = CancelToken::new();
        let generation = self.shared.advance(|generation| LoadStatus::Loading {
            key,
            generation,
            progress: StreamProgress::default(),
        });
        info!(%key, generation, source = self.source.name(), "graph load started");

        let task = tokio::spawn(run_load(
            self.source.clone(),
            key,
            self.options,
            self.shared.clone(),
            generation,
            cancel.clone(),
        ));
        *current = Some(InFlight {
            key,
            generation,
            cancel,
            task,
        });
        generation
    }

    /// Cancel the in-flight load, if any. A finished load is left as is.
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(prev) = current.take() else {
            return;
        };
        if prev.task.is_finished() {
            return;
        }
        stop(&prev);
        self.shared
            .advance(|generation| LoadStatus::Cancelled { key: prev.key, generation });
    }
}

impl<F: FrameSource> Drop for GraphLoader<F> {
    fn drop(&mut self) {
        let current = self.current.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = current.take() {
            stop(&prev);
        }
        self.source.end_session();
    }
}

fn stop(in_flight: &InFlight) {
    in_flight.cancel.cancel();
    in_flight.task.abort();
    debug!(key = %in_flight.key, generation = in_flight.generation, "load superseded");
}

async fn run_load<F: FrameSource>(
    source: Arc<F>,
    key: FilterKey,
    options: RenderOptions,
    shared: Arc<Shared>,
    generation: u64,
    cancel: CancelToken,
) {
    let progress_shared = shared.clone();
    let on_progress = move |progress: &StreamProgress| {
        progress_shared.publish(
            generation,
            LoadStatus::Loading {
                key,
                generation,
                progress: *progress,
            },
        );
    };

    let status = match fetch_render_graph(source.as_ref(), &key, &options, &cancel, on_progress).await {
        Ok(Some(graph)) => LoadStatus::Ready {
            key,
            generation,
            graph: Arc::new(graph),
        },
        Ok(None) => LoadStatus::Cancelled { key, generation },
        Err(e) => {
            warn!(%key, generation, error = %e, "graph load failed");
            LoadStatus::Failed {
                key,
                generation,
                message: e.to_string(),
            }
        }
    };
    if !shared.publish(generation, status) {
        debug!(%key, generation, "stale load result discarded");
    }
}

/// Open, decode and prepare one render graph. `Ok(None)` means `cancel`
/// fired first.
///
/// A stream that ends without its `complete` frame is still assembled
/// from what arrived.
pub async fn fetch_render_graph<F, P>(
    source: &F,
    key: &FilterKey,
    options: &RenderOptions,
    cancel: &CancelToken,
    on_progress: P,
) -> Result<Option<RenderGraph>, ScorigamiError>
where
    F: FrameSource + ?Sized,
    P: FnMut(&StreamProgress),
{
    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(None),
        body = source.open(key) => body?,
    };

    let mut decoder = FrameDecoder::new();
    let outcome = match body {
        FrameBody::Reader(reader) => decode_reader(reader, &mut decoder, cancel, on_progress).await?,
        FrameBody::Chunks(chunks) => decode_chunks(chunks, &mut decoder, cancel, on_progress).await?,
    };
    match outcome {
        DecodeOutcome::Aborted => return Ok(None),
        DecodeOutcome::Finished { complete: false } => {
            warn!(%key, nodes = decoder.nodes().len(), "stream ended without complete frame");
        }
        DecodeOutcome::Finished { complete: true } => {}
    }
    if decoder.parse_errors() > 0 {
        warn!(%key, errors = decoder.parse_errors(), "frames skipped");
    }

    let (nodes, edges) = decoder.into_parts();
    Ok(prepare_render_graph_cooperative(nodes, edges, key.seed(), options, cancel).await)
}
