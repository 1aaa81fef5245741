//! Graph endpoints.

use super::ApiError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::Response;
use axum::Json;
use scorigami_core::filter::{resolve, RawFilter};
use scorigami_core::frame::NDJSON_CONTENT_TYPE;
use scorigami_core::types::{Node, NodeId};
use scorigami_runtime::encoding::NodeColorMode;
use scorigami_runtime::render::{prepare_render_graph, RenderGraph, RenderOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Frames buffered between the encoder task and the response body.
const STREAM_BUFFER: usize = 16;

const STREAM_CACHE_CONTROL: &str = "public, max-age=300";
const GRAPH_CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=240";

/// Stream the graph for a filter selection as NDJSON frames.
///
/// Filter errors and store failures are reported before the first byte,
/// so a stream that starts is a stream with a dataset behind it.
pub async fn graph_stream(
    State(state): State<AppState>,
    Query(raw): Query<RawFilter>,
) -> Result<Response, ApiError> {
    let key = resolve(&raw)?.key;
    let dataset = state.executor().fetch(&key).await?;
    let request_id = Uuid::new_v4();

    let (tx, rx) = mpsc::channel::<Vec<u8>>(STREAM_BUFFER);
    let encoder = state.encoder;
    let span = info_span!("graph_stream", %request_id, %key);
    tokio::spawn(
        async move {
            match encoder.send_frames(&dataset, &tx).await {
                Ok(summary) if summary.completed => {
                    debug!(frames = summary.frames, bytes = summary.bytes, "stream finished")
                }
                Ok(summary) => info!(frames = summary.frames, "client left mid-stream"),
                Err(e) => warn!(error = %e, "stream encoding failed"),
            }
        }
        .instrument(span),
    );

    let frames = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (Ok::<_, Infallible>(line), rx))
    });
    Response::builder()
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, STREAM_CACHE_CONTROL)
        .header("x-request-id", request_id.to_string())
        .body(Body::from_stream(frames))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// The whole dataset as one JSON document.
pub async fn graph(
    State(state): State<AppState>,
    Query(raw): Query<RawFilter>,
) -> Result<Response, ApiError> {
    let key = resolve(&raw)?.key;
    let dataset = state.executor().fetch(&key).await?;
    let body = serde_json::to_vec(dataset.as_ref()).map_err(|e| ApiError::Internal(e.to_string()))?;
    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CACHE_CONTROL, GRAPH_CACHE_CONTROL)
        .body(Body::from(body))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct LayoutQuery {
    #[serde(flatten)]
    pub filter: RawFilter,
    /// `category` or `gradient`.
    #[serde(default)]
    pub color: Option<String>,
}

/// Server-side render graph: assembled, reduced, laid out and encoded.
pub async fn layout(
    State(state): State<AppState>,
    Query(query): Query<LayoutQuery>,
) -> Result<Json<RenderGraph>, ApiError> {
    let key = resolve(&query.filter)?.key;
    let color_mode = match query.color.as_deref() {
        Some(raw) => raw.parse::<NodeColorMode>().map_err(ApiError::BadRequest)?,
        None => state.render.color_mode,
    };
    let dataset = state.executor().fetch(&key).await?;

    let options = RenderOptions {
        color_mode,
        ..state.render
    };
    let graph = tokio::task::spawn_blocking(move || {
        prepare_render_graph(dataset.nodes.clone(), dataset.edges.clone(), key.seed(), &options)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("layout task failed: {}", e)))?;
    Ok(Json(graph))
}

/// A node of the selection with the ids of its children.
#[derive(Debug, Serialize)]
pub struct NodeDetail {
    #[serde(flatten)]
    pub node: Node,
    pub neighbours: Vec<NodeId>,
}

/// One node of the selection's graph, looked up in its dataset.
pub async fn node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(raw): Query<RawFilter>,
) -> Result<Json<NodeDetail>, ApiError> {
    let id: NodeId = id
        .parse()
        .map_err(|_| ApiError::BadRequest("id must be numeric".to_string()))?;
    let key = resolve(&raw)?.key;
    let dataset = state.executor().fetch(&key).await?;

    let node = dataset
        .nodes
        .iter()
        .find(|n| n.id == id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("node not found".to_string()))?;
    let neighbours = dataset
        .edges
        .iter()
        .filter(|e| e.from == id)
        .map(|e| e.to)
        .collect();
    Ok(Json(NodeDetail { node, neighbours }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store": state.store_name(),
    }))
}
